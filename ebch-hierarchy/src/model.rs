//! The road network the hierarchy is built from, and its conversion into a dynamic graph.
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ebch_core::errors::{
    Context,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    info,
    instrument,
    warn,
};

use crate::errors::GraphError;
use crate::graph::{
    add_or_update_edge,
    DirectedDynamicGraph,
    Direction,
    EdgeData,
};
use crate::restrictions::RestrictionTable;
use crate::weights::WeightHandler;

/// A road segment between two vertices.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Segment {
    /// One endpoint.
    pub from: u32,
    /// The other endpoint.
    pub to: u32,
    /// Cost of travelling the segment.
    pub weight: f32,
    /// Travel direction relative to `from -> to`.
    #[serde(default)]
    pub direction: Direction,
    /// Length, for handlers that track it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
    /// Travel time, for handlers that track it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f32>,
}

impl Segment {
    /// A segment without distance or time.
    pub const fn new(from: u32, to: u32, weight: f32, direction: Direction) -> Self {
        Self { from, to, weight, direction, distance: None, time: None }
    }
}

/// A road network as read from disk: vertices `0..vertex_count`, segments and forbidden maneuvers.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct RoadNetwork {
    /// Vertices are numbered `0..vertex_count`.
    pub vertex_count: u32,
    /// The roads.
    pub segments: Vec<Segment>,
    /// Forbidden vertex sequences.
    #[serde(default)]
    pub restrictions: Vec<Vec<u32>>,
}

impl RoadNetwork {
    /// Read a network serialized as JSON.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be opened or does not parse.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening network {}", path.display()))?;
        let network: Self =
            serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing network {}", path.display()))?;
        Ok(network)
    }

    /// Index the network's restrictions for lookup.
    pub fn restriction_table(&self) -> RestrictionTable {
        self.restrictions.iter().cloned().collect()
    }

    /// Build a graph using each segment's own weight.
    pub fn build_graph<H: WeightHandler>(&self, handler: &H) -> Result<DirectedDynamicGraph, GraphError> {
        self.build_graph_with(handler, |segment| Some((handler.segment_weight(segment), None)))
    }

    /// Build a graph with an external cost function.
    ///
    /// `weight_fn` returns the weight of a segment and optionally a direction that replaces the
    /// segment's own, or `None` when the segment cannot be travelled at all.  Every segment is
    /// stored at both endpoints; parallel segments collapse into the lightest edge per direction.
    #[instrument(skip_all, fields(vertices = self.vertex_count, segments = self.segments.len()))]
    pub fn build_graph_with<H, F>(&self, handler: &H, mut weight_fn: F) -> Result<DirectedDynamicGraph, GraphError>
    where
        H: WeightHandler,
        F: FnMut(&Segment) -> Option<(H::Weight, Option<Direction>)>,
    {
        let mut graph = DirectedDynamicGraph::with_vertices(self.vertex_count, handler.fixed_size());
        let mut skipped = 0;
        for segment in &self.segments {
            for vertex in [segment.from, segment.to] {
                if vertex >= self.vertex_count {
                    return Err(GraphError::VertexOutOfRange(vertex));
                }
            }
            if segment.from == segment.to {
                skipped += 1;
                continue;
            }
            let Some((weight, direction)) = weight_fn(segment) else {
                skipped += 1;
                continue;
            };

            let data = EdgeData::original(weight, direction.unwrap_or(segment.direction));
            add_or_update_edge(&mut graph, handler, segment.from, segment.to, &data, false)?;
            add_or_update_edge(&mut graph, handler, segment.to, segment.from, &data.reversed(), false)?;
        }

        if skipped > 0 {
            warn!("skipped {skipped} loops or untraversable segments");
        }
        info!("built graph with {} edges", graph.edge_count());
        Ok(graph)
    }
}
