use std::cmp::Reverse;
use std::collections::{
    BinaryHeap,
    VecDeque,
};

use ebch_core::CancellationToken;
use ordered_float::OrderedFloat;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
    instrument,
    warn,
};

use super::context::ContractionContext;
use super::priority::{
    EdgeDifferencePriorityCalculator,
    PriorityCalculator,
};
use super::witness::{
    DykstraWitnessCalculator,
    WitnessCalculator,
};
use crate::errors::{
    BuildError,
    GraphError,
};
use crate::graph::{
    DirectedDynamicGraph,
    NO_VERTEX,
};
use crate::restrictions::RestrictionLookup;
use crate::weights::WeightHandler;

/// Tunables for hierarchy construction.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ContractionParameters {
    /// Priority weight of shortcuts needed minus edges removed.
    pub difference_factor: f32,
    /// Priority weight of the hierarchy depth below a vertex.
    pub depth_factor: f32,
    /// Priority weight of the contracted neighbour count.
    pub contracted_factor: f32,
    /// Misses within the last `miss_threshold` queue pops that force a full priority recalculation.
    pub miss_threshold: usize,
    /// Most edges on a witness path.
    pub max_witness_hops: u32,
    /// Most states a witness search settles per direction.
    pub max_witness_settles: u32,
    /// Contractions between two checks of the cancellation token.
    pub cancellation_check_interval: usize,
}

impl Default for ContractionParameters {
    fn default() -> Self {
        Self {
            difference_factor: 1.0,
            depth_factor: 2.0,
            contracted_factor: 1.0,
            miss_threshold: 20,
            max_witness_hops: u32::MAX,
            max_witness_settles: u32::MAX,
            cancellation_check_interval: 64,
        }
    }
}

impl ContractionParameters {
    /// The priority factors tuned for edge-based contraction.
    pub fn edge_based() -> Self {
        Self { difference_factor: 5.0, depth_factor: 5.0, contracted_factor: 8.0, ..Self::default() }
    }
}

/// Where a [`HierarchyBuilder`] is in its run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BuilderState {
    /// Scoring the initial priorities.
    Initializing,
    /// Contracting vertices.
    Contracting,
    /// Every vertex is contracted and the graph is compressed.
    Done,
}

/// Contracts every vertex of a graph, in place, in priority order.
///
/// Priorities live in a lazy min-heap keyed by `(priority, vertex)`.  A popped vertex has its
/// priority recomputed; when it changed the vertex goes back into the queue and the pop counts as
/// a miss.  When every one of the last `miss_threshold` pops was a miss, all priorities are
/// recomputed at once.
///
/// After a vertex is contracted it keeps its edges to the vertices contracted after it, and every
/// copy of those edges at its neighbours is gone: the finished graph only points "upward".
pub struct HierarchyBuilder<'a, H, R: ?Sized, W = DykstraWitnessCalculator, P = EdgeDifferencePriorityCalculator> {
    /// The graph and everything that touches it.
    context: ContractionContext<'a, H, R, W>,
    /// Scores vertices.
    priorities: P,
    /// Lazy min-heap of `(priority, vertex)`.
    queue: BinaryHeap<Reverse<(OrderedFloat<f32>, u32)>>,
    /// Outcome of the last pops, `true` for a miss.
    misses: VecDeque<bool>,
    /// Window size and miss count that trigger a full recalculation.
    miss_threshold: usize,
    /// Where the run is.
    state: BuilderState,
    /// Vertices in contraction order.
    order: Vec<u32>,
    /// Contraction rank by vertex, [`NO_VERTEX`] while uncontracted.
    rank: Vec<u32>,
    /// Checked every `check_interval` contractions.
    cancellation: Option<CancellationToken>,
    /// Contractions between two cancellation checks.
    check_interval: usize,
}

impl<'a, H, R> HierarchyBuilder<'a, H, R>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
{
    /// A builder with the default calculators, configured from `parameters`.
    pub fn new(
        graph: &'a mut DirectedDynamicGraph,
        handler: &'a H,
        restrictions: &'a R,
        parameters: &ContractionParameters,
    ) -> Self {
        let witness = DykstraWitnessCalculator::new(parameters.max_witness_hops, parameters.max_witness_settles);
        let priorities = EdgeDifferencePriorityCalculator::new(
            parameters.difference_factor,
            parameters.depth_factor,
            parameters.contracted_factor,
        );
        let mut builder =
            Self::with_calculators(graph, handler, restrictions, witness, priorities, parameters.miss_threshold);
        builder.check_interval = parameters.cancellation_check_interval.max(1);
        builder
    }
}

impl<'a, H, R, W, P> HierarchyBuilder<'a, H, R, W, P>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
    W: WitnessCalculator,
    P: PriorityCalculator,
{
    /// A builder with custom witness and priority calculators.
    pub fn with_calculators(
        graph: &'a mut DirectedDynamicGraph,
        handler: &'a H,
        restrictions: &'a R,
        witness: W,
        priorities: P,
        miss_threshold: usize,
    ) -> Self {
        let vertex_count = graph.vertex_count() as usize;
        Self {
            context: ContractionContext::new(graph, handler, restrictions, witness),
            priorities,
            queue: BinaryHeap::with_capacity(vertex_count),
            misses: VecDeque::new(),
            miss_threshold: miss_threshold.max(1),
            state: BuilderState::Initializing,
            order: Vec::with_capacity(vertex_count),
            rank: vec![NO_VERTEX; vertex_count],
            cancellation: None,
            check_interval: ContractionParameters::default().cancellation_check_interval,
        }
    }

    /// Abort the run once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Where the run is.
    pub const fn state(&self) -> BuilderState {
        self.state
    }

    /// Whether every vertex is contracted.
    pub fn has_succeeded(&self) -> bool {
        self.state == BuilderState::Done
    }

    /// The graph being contracted.
    pub fn graph(&self) -> &DirectedDynamicGraph {
        self.context.graph()
    }

    /// The priority calculator.
    pub const fn priorities(&self) -> &P {
        &self.priorities
    }

    /// Vertices in the order they were contracted.
    pub fn order(&self) -> &[u32] {
        &self.order
    }

    /// Position of `vertex` in the contraction order, `None` while it is not contracted.
    pub fn rank(&self, vertex: u32) -> Option<u32> {
        self.rank.get(vertex as usize).copied().filter(|&rank| rank != NO_VERTEX)
    }

    /// Shortcut records written so far, counting both stored copies.
    pub const fn shortcuts_added(&self) -> usize {
        self.context.shortcuts_added()
    }

    /// Contract the whole graph in priority order.
    pub fn run(&mut self) -> Result<(), BuildError> {
        self.run_with_progress(|_, _| {})
    }

    /// Contract the whole graph in priority order, calling `progress(contracted, total)` after
    /// every contraction.
    #[instrument(skip_all, fields(vertices = self.context.graph().vertex_count()))]
    pub fn run_with_progress<F>(&mut self, mut progress: F) -> Result<(), BuildError>
    where
        F: FnMut(usize, usize),
    {
        self.check_cancelled()?;
        self.initialize()?;

        let total = self.context.graph().vertex_count() as usize;
        while let Some(vertex) = self.select_next()? {
            self.contract(vertex)?;
            progress(self.order.len(), total);
            if self.order.len() % self.check_interval == 0 {
                self.check_cancelled()?;
            }
        }

        self.finish();
        Ok(())
    }

    /// Contract vertices in the given order, then whatever is left in id order.
    #[instrument(skip_all, fields(vertices = self.context.graph().vertex_count()))]
    pub fn run_with_order<I>(&mut self, order: I) -> Result<(), BuildError>
    where
        I: IntoIterator<Item = u32>,
    {
        self.check_cancelled()?;
        self.state = BuilderState::Contracting;

        let vertex_count = self.context.graph().vertex_count();
        for vertex in order.into_iter().chain(0..vertex_count) {
            if vertex >= vertex_count {
                return Err(GraphError::VertexOutOfRange(vertex).into());
            }
            if self.context.is_contracted(vertex) {
                continue;
            }
            self.contract(vertex)?;
            if self.order.len() % self.check_interval == 0 {
                self.check_cancelled()?;
            }
        }

        self.finish();
        Ok(())
    }

    /// Score every vertex.
    fn initialize(&mut self) -> Result<(), BuildError> {
        self.state = BuilderState::Initializing;
        self.recalculate_queue()?;
        self.state = BuilderState::Contracting;
        info!("queued {} vertices", self.queue.len());
        Ok(())
    }

    /// Rebuild the queue from fresh priorities.
    #[instrument(skip_all)]
    fn recalculate_queue(&mut self) -> Result<(), BuildError> {
        self.queue.clear();
        for vertex in 0..self.context.graph().vertex_count() {
            if self.context.is_contracted(vertex) {
                continue;
            }
            let priority = self.priorities.calculate(&mut self.context, vertex)?;
            self.queue.push(Reverse((OrderedFloat(priority), vertex)));
        }
        Ok(())
    }

    /// Pop vertices until one still has its queued priority.
    fn select_next(&mut self) -> Result<Option<u32>, BuildError> {
        while let Some(Reverse((OrderedFloat(queued), vertex))) = self.queue.pop() {
            if self.context.is_contracted(vertex) {
                continue;
            }

            let priority = self.priorities.calculate(&mut self.context, vertex)?;
            if priority == queued {
                self.record_miss(false);
                return Ok(Some(vertex));
            }

            debug!(vertex, queued, priority, "priority changed, requeueing");
            self.queue.push(Reverse((OrderedFloat(priority), vertex)));
            if self.record_miss(true) {
                debug!("too many misses, recalculating every priority");
                self.recalculate_queue()?;
            }
        }
        Ok(None)
    }

    /// Returns true when the window is full of misses; the window is then cleared.
    fn record_miss(&mut self, miss: bool) -> bool {
        self.misses.push_back(miss);
        if self.misses.len() > self.miss_threshold {
            self.misses.pop_front();
        }
        if self.misses.iter().filter(|&&miss| miss).count() >= self.miss_threshold {
            self.misses.clear();
            return true;
        }
        false
    }

    /// Remove `vertex` from the remaining graph, adding the shortcuts it needs.
    fn contract(&mut self, vertex: u32) -> Result<(), BuildError> {
        self.context.remove_contracted_neighbours(vertex);
        let edges = self.context.incident_edges(vertex)?;
        for edge in &edges {
            self.context.graph_mut().remove_edge(edge.neighbour, vertex);
        }

        let shortcuts = self.context.add_shortcuts(vertex, &edges, None)?;
        self.context.mark_contracted(vertex);

        #[allow(clippy::cast_possible_truncation)]
        let rank = self.order.len() as u32;
        self.rank[vertex as usize] = rank;
        self.order.push(vertex);
        self.priorities.notify_contracted(self.context.graph(), vertex);

        debug!(vertex, rank, edges = edges.len(), shortcuts = shortcuts.needed, "contracted");
        Ok(())
    }

    /// Compress the graph and mark the run done.
    fn finish(&mut self) {
        self.context.graph_mut().compress();
        self.state = BuilderState::Done;
        info!(
            contracted = self.order.len(),
            shortcuts = self.context.shortcuts_added(),
            edges = self.context.graph().edge_count(),
            "hierarchy built"
        );
    }

    /// Fail once the cancellation token fired.
    fn check_cancelled(&self) -> Result<(), BuildError> {
        if self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
            warn!(contracted = self.order.len(), "contraction cancelled");
            return Err(BuildError::Cancelled);
        }
        Ok(())
    }
}
