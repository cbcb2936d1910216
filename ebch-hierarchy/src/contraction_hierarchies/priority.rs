use itertools::Itertools;
use tracing::trace;

use super::context::ContractionContext;
use super::witness::WitnessCalculator;
use crate::errors::GraphError;
use crate::graph::DirectedDynamicGraph;
use crate::restrictions::RestrictionLookup;
use crate::weights::WeightHandler;

/// Scores vertices for contraction; lower scores are contracted first.
pub trait PriorityCalculator {
    /// The current priority of `vertex`.
    ///
    /// This is not a read-only operation: it drops edges from `vertex` to contracted neighbours and
    /// inserts the shortcuts contracting `vertex` would need.
    fn calculate<H, R, W>(
        &mut self,
        context: &mut ContractionContext<'_, H, R, W>,
        vertex: u32,
    ) -> Result<f32, GraphError>
    where
        H: WeightHandler,
        R: RestrictionLookup + ?Sized,
        W: WitnessCalculator;

    /// Update neighbour statistics after `vertex` was contracted; its remaining edges point at
    /// its neighbours.
    fn notify_contracted(&mut self, graph: &DirectedDynamicGraph, vertex: u32);
}

/// Edge difference plus hierarchy depth plus the number of contracted neighbours.
#[derive(Clone, Debug)]
pub struct EdgeDifferencePriorityCalculator {
    /// Weight of shortcuts needed minus edges removed.
    pub difference_factor: f32,
    /// Weight of the hierarchy depth below a vertex.
    pub depth_factor: f32,
    /// Weight of the contracted neighbour count.
    pub contracted_factor: f32,
    /// Depth of the hierarchy below each vertex.
    depth: Vec<u32>,
    /// Contracted neighbours of each vertex.
    contracted_neighbours: Vec<u32>,
}

impl Default for EdgeDifferencePriorityCalculator {
    fn default() -> Self {
        Self::new(1.0, 2.0, 1.0)
    }
}

impl EdgeDifferencePriorityCalculator {
    /// A calculator with the given factors.
    pub const fn new(difference_factor: f32, depth_factor: f32, contracted_factor: f32) -> Self {
        Self { difference_factor, depth_factor, contracted_factor, depth: Vec::new(), contracted_neighbours: Vec::new() }
    }

    /// Factors tuned for edge-based contraction, where shortcuts are more expensive.
    pub const fn edge_based() -> Self {
        Self::new(5.0, 5.0, 8.0)
    }

    /// Depth of the hierarchy below `vertex`.
    pub fn depth(&self, vertex: u32) -> u32 {
        self.depth.get(vertex as usize).copied().unwrap_or_default()
    }

    /// How many neighbours of `vertex` were contracted before it.
    pub fn contracted_neighbours(&self, vertex: u32) -> u32 {
        self.contracted_neighbours.get(vertex as usize).copied().unwrap_or_default()
    }
}

impl PriorityCalculator for EdgeDifferencePriorityCalculator {
    fn calculate<H, R, W>(
        &mut self,
        context: &mut ContractionContext<'_, H, R, W>,
        vertex: u32,
    ) -> Result<f32, GraphError>
    where
        H: WeightHandler,
        R: RestrictionLookup + ?Sized,
        W: WitnessCalculator,
    {
        context.remove_contracted_neighbours(vertex);
        let edges = context.incident_edges(vertex)?;
        let shortcuts = context.add_shortcuts(vertex, &edges, Some(vertex))?;

        #[allow(clippy::cast_precision_loss)]
        let difference = shortcuts.needed as f32 - edges.len() as f32;
        #[allow(clippy::cast_precision_loss)]
        let priority = self.difference_factor * difference
            + self.depth_factor * self.depth(vertex) as f32
            + self.contracted_factor * self.contracted_neighbours(vertex) as f32;

        trace!(vertex, priority, removed = edges.len(), added = shortcuts.needed, "priority");
        Ok(priority)
    }

    fn notify_contracted(&mut self, graph: &DirectedDynamicGraph, vertex: u32) {
        let vertex_count = graph.vertex_count() as usize;
        if self.depth.len() < vertex_count {
            self.depth.resize(vertex_count, 0);
            self.contracted_neighbours.resize(vertex_count, 0);
        }

        let depth = self.depth(vertex) + 1;
        for neighbour in graph.edges(vertex).map(|edge| edge.neighbour() as usize).unique() {
            self.depth[neighbour] = self.depth[neighbour].max(depth);
            self.contracted_neighbours[neighbour] += 1;
        }
    }
}
