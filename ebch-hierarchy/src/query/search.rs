use std::cmp::Reverse;
use std::collections::{
    BinaryHeap,
    HashMap,
};

use ordered_float::OrderedFloat;

use super::expand::expand_edge;
use super::EdgePath;
use crate::errors::GraphError;
use crate::graph::{
    DirectedDynamicGraph,
    DirectedEdgeId,
};
use crate::restrictions::{
    extend_history,
    is_legal_joint,
    leading_vertices,
    RestrictionLookup,
};
use crate::weights::WeightHandler;

/// One node of the path tree a search grows.  Nodes only point at older nodes, so the tree lives
/// in a plain arena indexed by insertion order.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PathNode {
    /// The reached vertex.
    pub vertex: u32,
    /// Weight from the root, head start included.
    pub weight: f32,
    /// The edge used to reach `vertex`, `NO_EDGE` for roots.
    pub edge: DirectedEdgeId,
    /// The original vertices right before `vertex` in search order, empty for roots.
    pub history: Vec<u32>,
    /// The node this one was reached from.
    pub previous: Option<usize>,
}

impl PathNode {
    /// Whether this node is a source or target handed to the search.
    pub const fn is_root(&self) -> bool {
        self.previous.is_none()
    }

    /// The node as seen from outside the search.
    pub const fn as_edge_path(&self) -> EdgePath {
        EdgePath { vertex: self.vertex, weight: self.weight, edge: self.edge }
    }
}

/// One direction of a Dykstra search over the upward graph.
///
/// Settlement is per `(vertex, edge, history)`: a vertex reached again over a different edge, or
/// after different original vertices, may allow different maneuvers onward.
pub(crate) struct SearchSide {
    /// Whether edges are followed in their forward direction.
    forward: bool,
    /// Arena of every node pushed so far.
    nodes: Vec<PathNode>,
    /// Unsettled nodes by weight.
    heap: BinaryHeap<Reverse<(OrderedFloat<f32>, usize)>>,
    /// Settled nodes by vertex.
    visits: HashMap<u32, Vec<usize>>,
}

impl SearchSide {
    /// A side growing from `roots`.
    pub fn new(forward: bool, roots: &[EdgePath]) -> Self {
        let mut side = Self { forward, nodes: vec![], heap: BinaryHeap::new(), visits: HashMap::new() };
        for root in roots.iter().map(|root| root.strip()) {
            side.push(PathNode {
                vertex: root.vertex,
                weight: root.weight,
                edge: root.edge,
                history: vec![],
                previous: None,
            });
        }
        side
    }

    /// Weight of the lightest unsettled node, infinite when there is none.
    pub fn peek_weight(&self) -> f32 {
        self.heap.peek().map_or(f32::INFINITY, |Reverse((weight, _))| weight.0)
    }

    /// The node with arena index `id`.
    pub fn node(&self, id: usize) -> &PathNode {
        &self.nodes[id]
    }

    /// Settled nodes at `vertex`, in settlement order.
    pub fn visits(&self, vertex: u32) -> &[usize] {
        self.visits.get(&vertex).map_or(&[][..], Vec::as_slice)
    }

    /// Number of distinct settled vertices.
    pub fn settled_vertices(&self) -> usize {
        self.visits.len()
    }

    /// Pop the lightest node whose `(vertex, edge, history)` combination is not settled yet and
    /// settle it.
    pub fn settle_next(&mut self) -> Option<usize> {
        while let Some(Reverse((_, id))) = self.heap.pop() {
            let node = &self.nodes[id];
            let visits = self.visits.entry(node.vertex).or_default();
            if visits
                .iter()
                .any(|&other| self.nodes[other].edge == node.edge && self.nodes[other].history == node.history)
            {
                continue;
            }
            visits.push(id);
            return Some(id);
        }
        None
    }

    /// Push every neighbour of node `id` reachable over an edge this side may travel, unless the
    /// maneuver at the node's vertex is forbidden or the result would weigh more than `max_weight`.
    pub fn relax<H, R>(&mut self, graph: &DirectedDynamicGraph, handler: &H, restrictions: &R, id: usize, max_weight: f32)
    where
        H: WeightHandler,
        R: RestrictionLookup + ?Sized,
    {
        let history_len = restrictions.history_len();
        let node = self.nodes[id].clone();
        for edge in graph.edges(node.vertex) {
            let (weight, direction) = handler.weight(edge.fixed());
            if (self.forward && !direction.forward()) || (!self.forward && !direction.backward()) {
                continue;
            }

            if !node.is_root() {
                let next = leading_vertices(&edge.leading(), edge.neighbour(), history_len);
                let legal = if self.forward {
                    is_legal_joint(restrictions, &node.history, node.vertex, &next)
                } else {
                    let before: Vec<u32> = next.iter().rev().copied().collect();
                    let after: Vec<u32> = node.history.iter().rev().copied().collect();
                    is_legal_joint(restrictions, &before, node.vertex, &after)
                };
                if !legal {
                    continue;
                }
            }

            let next = node.weight + weight;
            if next > max_weight {
                continue;
            }
            let edge_id = if self.forward {
                DirectedEdgeId::forward(edge.index())
            } else {
                DirectedEdgeId::backward(edge.index())
            };
            self.push(PathNode {
                vertex: edge.neighbour(),
                weight: next,
                edge: edge_id,
                history: extend_history(&node.history, node.vertex, &edge.trailing(), history_len),
                previous: Some(id),
            });
        }
    }

    /// Nodes from `id` back to its root.
    pub fn chain(&self, id: usize) -> Vec<PathNode> {
        let mut chain = vec![self.nodes[id].clone()];
        let mut previous = self.nodes[id].previous;
        while let Some(id) = previous {
            chain.push(self.nodes[id].clone());
            previous = self.nodes[id].previous;
        }
        chain
    }

    /// The original vertices along the path of node `id`, in travel direction: from the root to
    /// the node for a forward side, from the node to the root for a backward one.
    pub fn expand<H, R>(
        &self,
        graph: &DirectedDynamicGraph,
        handler: &H,
        restrictions: &R,
        id: usize,
    ) -> Result<Vec<u32>, GraphError>
    where
        H: WeightHandler,
        R: RestrictionLookup + ?Sized,
    {
        let mut chain = self.chain(id);
        if self.forward {
            chain.reverse();
        }

        let mut vertices = vec![chain[0].vertex];
        for (current, next) in chain.iter().zip(chain.iter().skip(1)) {
            // Forward nodes store the edge that reached them, backward nodes the edge that leaves them.
            let edge = if self.forward { next.edge } else { current.edge };
            vertices.extend(expand_edge(graph, handler, restrictions, current.vertex, next.vertex, edge)?);
        }
        Ok(vertices)
    }

    /// Add `node` to the arena and the heap.
    fn push(&mut self, node: PathNode) {
        let id = self.nodes.len();
        self.heap.push(Reverse((OrderedFloat(node.weight), id)));
        self.nodes.push(node);
    }
}
