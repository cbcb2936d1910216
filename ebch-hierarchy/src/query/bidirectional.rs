use tracing::{
    debug,
    instrument,
    trace,
};

use super::search::SearchSide;
use super::{
    EdgePath,
    QueryStatus,
    Route,
};
use crate::errors::QueryError;
use crate::graph::DirectedDynamicGraph;
use crate::restrictions::{
    is_legal_joint,
    RestrictionLookup,
};
use crate::weights::WeightHandler;

/// Point-to-point query: a forward search from the sources and a backward search from the
/// targets, both climbing the hierarchy, meeting at the highest vertex of the route.
///
/// Whenever one side settles a vertex the other side already settled, every pair of settlements
/// at that vertex is a candidate route.  A candidate counts only when the maneuver through the
/// meeting vertex is legal.  The search stops once neither side can reach anything lighter than
/// the best candidate.
pub struct BidirectionalDykstra<'a, H, R: ?Sized> {
    /// The contracted graph.
    graph: &'a DirectedDynamicGraph,
    /// Decodes edge weights.
    handler: &'a H,
    /// Decides which maneuvers are legal.
    restrictions: &'a R,
    /// The side growing from the sources.
    forward: SearchSide,
    /// The side growing from the targets.
    backward: SearchSide,
    /// Forward and backward node of the best meeting so far.
    best: Option<(usize, usize)>,
    /// Weight of the best meeting so far.
    best_weight: f32,
    /// Where the query is.
    status: QueryStatus,
}

impl<'a, H, R> BidirectionalDykstra<'a, H, R>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
{
    /// A query from any of `sources` to any of `targets`.
    pub fn new(
        graph: &'a DirectedDynamicGraph,
        handler: &'a H,
        restrictions: &'a R,
        sources: &[EdgePath],
        targets: &[EdgePath],
    ) -> Self {
        Self {
            graph,
            handler,
            restrictions,
            forward: SearchSide::new(true, sources),
            backward: SearchSide::new(false, targets),
            best: None,
            best_weight: f32::INFINITY,
            status: QueryStatus::NotRun,
        }
    }

    /// A query between two single vertices.
    pub fn between(graph: &'a DirectedDynamicGraph, handler: &'a H, restrictions: &'a R, from: u32, to: u32) -> Self {
        Self::new(graph, handler, restrictions, &[EdgePath::new(from)], &[EdgePath::new(to)])
    }

    /// Where the query is.
    pub const fn status(&self) -> QueryStatus {
        self.status
    }

    /// Whether a route was found.
    pub fn has_succeeded(&self) -> bool {
        self.status == QueryStatus::Succeeded
    }

    /// Run both sides until the best route is certain; returns whether there is one.  Running a
    /// finished query again only reports the earlier outcome.
    #[instrument(skip_all)]
    pub fn run(&mut self) -> bool {
        if self.status != QueryStatus::NotRun {
            return self.has_succeeded();
        }
        self.status = QueryStatus::Running;

        loop {
            let forward_weight = self.forward.peek_weight();
            let backward_weight = self.backward.peek_weight();
            if forward_weight >= self.best_weight && backward_weight >= self.best_weight {
                break;
            }

            if forward_weight < self.best_weight {
                self.step(true);
            }
            if backward_weight < self.best_weight {
                self.step(false);
            }
        }

        self.status = if self.best.is_some() { QueryStatus::Succeeded } else { QueryStatus::Failed };
        debug!(
            status = ?self.status,
            weight = self.best_weight,
            forward = self.forward.settled_vertices(),
            backward = self.backward.settled_vertices(),
            "query finished"
        );
        self.has_succeeded()
    }

    /// The weight of the best route.
    pub fn best(&self) -> Result<f32, QueryError> {
        self.check_succeeded()?;
        Ok(self.best_weight)
    }

    /// The original vertices of the best route, from source to target.
    pub fn get_path(&self) -> Result<Vec<u32>, QueryError> {
        self.check_succeeded()?;
        let Some((forward, backward)) = self.best else {
            return Err(QueryError::NoRoute);
        };

        let mut vertices = self.forward.expand(self.graph, self.handler, self.restrictions, forward)?;
        let tail = self.backward.expand(self.graph, self.handler, self.restrictions, backward)?;
        vertices.extend(tail.into_iter().skip(1));
        Ok(vertices)
    }

    /// Weight and original vertices of the best route.
    pub fn route(&self) -> Result<Route, QueryError> {
        Ok(Route { weight: self.best()?, vertices: self.get_path()? })
    }

    /// Fail unless the query found a route.
    fn check_succeeded(&self) -> Result<(), QueryError> {
        match self.status {
            QueryStatus::Succeeded => Ok(()),
            QueryStatus::Failed => Err(QueryError::NoRoute),
            QueryStatus::NotRun | QueryStatus::Running => Err(QueryError::NotRun),
        }
    }

    /// Settle the next node on one side and check it against the other side.
    fn step(&mut self, forward: bool) {
        let (side, other) = if forward {
            (&mut self.forward, &self.backward)
        } else {
            (&mut self.backward, &self.forward)
        };
        let Some(id) = side.settle_next() else {
            return;
        };

        let node = side.node(id).clone();
        for &other_id in other.visits(node.vertex) {
            let other_node = other.node(other_id);
            let (incoming, outgoing) = if forward { (&node, other_node) } else { (other_node, &node) };
            let after: Vec<u32> = outgoing.history.iter().rev().copied().collect();
            let legal = incoming.is_root()
                || outgoing.is_root()
                || is_legal_joint(self.restrictions, &incoming.history, node.vertex, &after);
            let weight = node.weight + other_node.weight;
            if !legal || weight >= self.best_weight {
                continue;
            }

            trace!(vertex = node.vertex, weight, "better meeting point");
            self.best_weight = weight;
            self.best = Some(if forward { (id, other_id) } else { (other_id, id) });
        }

        side.relax(self.graph, self.handler, self.restrictions, id, self.best_weight);
    }
}
