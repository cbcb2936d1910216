//! Shortest-path queries over a contracted graph.
//!
//! Every edge left in a contracted graph points from a vertex to one contracted after it, so
//! both query directions only ever climb the hierarchy.  The forward side follows edges in their
//! forward direction from the sources; the backward side follows edges against their direction
//! from the targets.  Searches track `(vertex, edge, history)` states instead of plain vertices,
//! because the original vertices a route arrived from decide which maneuvers it may take next.

/// Point-to-point queries.
mod bidirectional;
/// One-to-all searches.
mod dykstra;
/// Shortcut unpacking.
mod expand;
/// The search machinery both query kinds share.
mod search;

#[cfg(test)]
#[allow(clippy::missing_docs_in_private_items)]
mod tests;

pub use bidirectional::BidirectionalDykstra;
pub use dykstra::Dykstra;
pub use expand::{
    expand_edge,
    original_edges,
};
use itertools::Itertools;
use serde::Serialize;

use crate::graph::{
    DirectedEdgeId,
    NO_EDGE,
};

/// A vertex reached by a search, the total weight to get there and the edge it arrived over.
///
/// Sources and targets handed to a query are edge paths too.  Their weight is kept as a head
/// start, their edge is [stripped](EdgePath::strip).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgePath {
    /// The reached vertex.
    pub vertex: u32,
    /// Weight of the path.
    pub weight: f32,
    /// The edge the path arrived over, [`NO_EDGE`] for none.
    pub edge: DirectedEdgeId,
}

impl EdgePath {
    /// A path that is just `vertex`.
    pub const fn new(vertex: u32) -> Self {
        Self { vertex, weight: 0.0, edge: NO_EDGE }
    }

    /// A path that is just `vertex`, with a head start of `weight`.
    pub const fn with_weight(vertex: u32, weight: f32) -> Self {
        Self { vertex, weight, edge: NO_EDGE }
    }

    /// The same path without the edge it arrived over.
    #[must_use]
    pub const fn strip(&self) -> Self {
        Self { edge: NO_EDGE, ..*self }
    }
}

/// Where a search is in its run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryStatus {
    /// Not started.
    NotRun,
    /// Started and not finished.
    Running,
    /// Finished with a result.
    Succeeded,
    /// Finished without a route.
    Failed,
}

/// A segment of the input network, as travelled by a route.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub struct OriginalEdge {
    /// Where the segment is entered.
    pub vertex1: u32,
    /// Where the segment is left.
    pub vertex2: u32,
}

/// A route through the original graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Route {
    /// Total weight.
    pub weight: f32,
    /// Original vertices from source to target.
    pub vertices: Vec<u32>,
}

impl Route {
    /// The segments the route travels, in order.
    pub fn original_edges(&self) -> Vec<OriginalEdge> {
        self.vertices
            .iter()
            .copied()
            .tuple_windows()
            .map(|(vertex1, vertex2)| OriginalEdge { vertex1, vertex2 })
            .collect()
    }
}
