use tracing::debug;

use super::search::SearchSide;
use super::{
    EdgePath,
    QueryStatus,
};
use crate::errors::QueryError;
use crate::graph::DirectedDynamicGraph;
use crate::restrictions::RestrictionLookup;
use crate::weights::WeightHandler;

/// A one-to-all search climbing the hierarchy from a set of sources.
///
/// A backward search follows edges against their direction, so it finds the upward half of the
/// routes that end at the sources.
pub struct Dykstra<'a, H, R: ?Sized> {
    /// The contracted graph.
    graph: &'a DirectedDynamicGraph,
    /// Decodes edge weights.
    handler: &'a H,
    /// Decides which maneuvers are legal.
    restrictions: &'a R,
    /// The growing search.
    side: SearchSide,
    /// Paths heavier than this are not followed.
    max_weight: f32,
    /// Where the search is.
    status: QueryStatus,
}

impl<'a, H, R> Dykstra<'a, H, R>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
{
    /// A search from `sources`, against edge direction when `backward`.
    pub fn new(
        graph: &'a DirectedDynamicGraph,
        handler: &'a H,
        restrictions: &'a R,
        sources: &[EdgePath],
        backward: bool,
    ) -> Self {
        Self {
            graph,
            handler,
            restrictions,
            side: SearchSide::new(!backward, sources),
            max_weight: f32::INFINITY,
            status: QueryStatus::NotRun,
        }
    }

    /// Stop following paths heavier than `max_weight`.
    #[must_use]
    pub const fn with_max_weight(mut self, max_weight: f32) -> Self {
        self.max_weight = max_weight;
        self
    }

    /// Where the search is.
    pub const fn status(&self) -> QueryStatus {
        self.status
    }

    /// Settle everything reachable within the maximum weight.  The search always succeeds, even
    /// when it settles nothing but its sources.
    pub fn run(&mut self) {
        if self.status != QueryStatus::NotRun {
            return;
        }
        self.status = QueryStatus::Running;

        let mut settled = 0;
        while let Some(id) = self.side.settle_next() {
            settled += 1;
            self.side.relax(self.graph, self.handler, self.restrictions, id, self.max_weight);
        }

        debug!(settled, vertices = self.side.settled_vertices(), "dykstra finished");
        self.status = QueryStatus::Succeeded;
    }

    /// Every distinct way `vertex` was settled, lightest first.
    pub fn visits(&self, vertex: u32) -> Vec<EdgePath> {
        self.side.visits(vertex).iter().map(|&id| self.side.node(id).as_edge_path()).collect()
    }

    /// The lightest weight `vertex` was settled at.
    pub fn weight(&self, vertex: u32) -> Option<f32> {
        self.side.visits(vertex).first().map(|&id| self.side.node(id).weight)
    }

    /// The original vertices on the lightest path between the sources and `vertex`, in travel
    /// direction.
    pub fn path(&self, vertex: u32) -> Result<Vec<u32>, QueryError> {
        if self.status != QueryStatus::Succeeded {
            return Err(QueryError::NotRun);
        }
        let id = self.side.visits(vertex).first().copied().ok_or(QueryError::NoRoute)?;
        Ok(self.side.expand(self.graph, self.handler, self.restrictions, id)?)
    }
}
