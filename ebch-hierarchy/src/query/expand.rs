use std::iter;

use itertools::Itertools;
use ordered_float::OrderedFloat;

use super::OriginalEdge;
use crate::errors::GraphError;
use crate::graph::{
    DirectedDynamicGraph,
    DirectedEdgeId,
    EdgeView,
};
use crate::restrictions::{
    extend_history,
    is_legal_joint,
    leading_vertices,
    RestrictionLookup,
};
use crate::weights::WeightHandler;

/// An edge of the hierarchy seen in travel direction, whichever endpoint stores it.
#[derive(Clone, Debug, PartialEq)]
struct OrientedEdge {
    /// Where travel starts.
    from: u32,
    /// Where travel ends.
    to: u32,
    /// Scalar weight.
    weight: f32,
    /// Stored original vertices right after `from`, in travel order.
    leading: Vec<u32>,
    /// Stored original vertices right before `to`, in travel order.
    trailing: Vec<u32>,
    /// The bypassed vertex of a shortcut.
    contracted: Option<u32>,
}

impl OrientedEdge {
    /// An edge stored at `from`.
    fn stored_at_from<H: WeightHandler>(handler: &H, from: u32, edge: &EdgeView<'_>) -> Self {
        Self {
            from,
            to: edge.neighbour(),
            weight: handler.weight(edge.fixed()).0,
            leading: edge.leading(),
            trailing: edge.trailing(),
            contracted: edge.contracted(),
        }
    }

    /// An edge stored at `to`; its sequences read the other way round.
    fn stored_at_to<H: WeightHandler>(handler: &H, to: u32, edge: &EdgeView<'_>) -> Self {
        Self {
            from: edge.neighbour(),
            to,
            weight: handler.weight(edge.fixed()).0,
            leading: edge.trailing().into_iter().rev().collect(),
            trailing: edge.leading().into_iter().rev().collect(),
            contracted: edge.contracted(),
        }
    }
}

/// Expand the edge `id`, travelled from `from` to `to`, into original vertices.
///
/// The result starts after `from` and ends with `to`.  A forward id names an edge stored at
/// `from`, a backward id one stored at `to`.
pub fn expand_edge<H, R>(
    graph: &DirectedDynamicGraph,
    handler: &H,
    restrictions: &R,
    from: u32,
    to: u32,
    id: DirectedEdgeId,
) -> Result<Vec<u32>, GraphError>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
{
    let edge = graph.edge(id)?;
    let oriented = if id.is_forward() {
        OrientedEdge::stored_at_from(handler, from, &edge)
    } else {
        OrientedEdge::stored_at_to(handler, to, &edge)
    };
    if oriented.from != from || oriented.to != to {
        return Err(GraphError::InvalidEdgeId(id.0));
    }

    let mut vertices = vec![];
    let expansion = Expansion { graph, handler, history_len: restrictions.history_len(), restrictions };
    expansion.expand_into(&oriented, 0, &mut vertices)?;
    Ok(vertices)
}

/// The segments of the input network the edge `id` stands for, in travel order.
pub fn original_edges<H, R>(
    graph: &DirectedDynamicGraph,
    handler: &H,
    restrictions: &R,
    from: u32,
    to: u32,
    id: DirectedEdgeId,
) -> Result<Vec<OriginalEdge>, GraphError>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
{
    let vertices = expand_edge(graph, handler, restrictions, from, to, id)?;
    Ok(iter::once(from)
        .chain(vertices)
        .tuple_windows()
        .map(|(vertex1, vertex2)| OriginalEdge { vertex1, vertex2 })
        .collect())
}

/// Every edge that can be travelled from `from` to `to`.
fn oriented_edges<H: WeightHandler>(graph: &DirectedDynamicGraph, handler: &H, from: u32, to: u32) -> Vec<OrientedEdge> {
    let stored_at_from = graph
        .edges(from)
        .filter(|edge| edge.neighbour() == to && handler.weight(edge.fixed()).1.forward())
        .map(|edge| OrientedEdge::stored_at_from(handler, from, &edge));
    let stored_at_to = graph
        .edges(to)
        .filter(|edge| edge.neighbour() == from && handler.weight(edge.fixed()).1.backward())
        .map(|edge| OrientedEdge::stored_at_to(handler, to, &edge));
    stored_at_from.chain(stored_at_to).collect()
}

/// Recursive shortcut unpacking over one graph.
struct Expansion<'a, H, R: ?Sized> {
    /// The contracted graph.
    graph: &'a DirectedDynamicGraph,
    /// Decodes edge weights.
    handler: &'a H,
    /// Decides which component pairs are legal.
    restrictions: &'a R,
    /// Original vertices remembered on each side of a vertex.
    history_len: usize,
}

impl<H, R> Expansion<'_, H, R>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
{
    /// Push the original vertices of `edge` after its start onto `vertices`.
    fn expand_into(&self, edge: &OrientedEdge, depth: u32, vertices: &mut Vec<u32>) -> Result<(), GraphError> {
        let Some(via) = edge.contracted else {
            vertices.push(edge.to);
            return Ok(());
        };
        let failed = GraphError::ExpansionFailed { from: edge.from, to: edge.to, via };
        if depth > self.graph.vertex_count() {
            return Err(failed);
        }

        // The component edges of a shortcut through `via` are the edges `from -> via` and
        // `via -> to`.  Components may have been replaced by lighter edges since the shortcut was
        // written, so the pair is chosen by matching stored sequences first and weight second,
        // never taking a forbidden maneuver at `via`.
        let firsts = oriented_edges(self.graph, self.handler, edge.from, via);
        let seconds = oriented_edges(self.graph, self.handler, via, edge.to);
        let best = firsts
            .iter()
            .cartesian_product(seconds.iter())
            .filter(|(first, second)| self.is_legal_pair(first, via, second))
            .min_by_key(|(first, second)| {
                let weight = first.weight + second.weight;
                (mismatches(edge, first, via, second), OrderedFloat((weight - edge.weight).abs()), OrderedFloat(weight))
            });
        let Some((first, second)) = best else {
            return Err(failed);
        };

        self.expand_into(first, depth + 1, vertices)?;
        self.expand_into(second, depth + 1, vertices)
    }

    /// Whether a route may run over `first` and then `second` through `via`.
    fn is_legal_pair(&self, first: &OrientedEdge, via: u32, second: &OrientedEdge) -> bool {
        let before = extend_history(&[], first.from, &first.trailing, self.history_len);
        let after = leading_vertices(&second.leading, second.to, self.history_len);
        is_legal_joint(self.restrictions, &before, via, &after)
    }
}

/// How many of the stored sequences of `edge` the pair `first`, `second` fails to reproduce.
fn mismatches(edge: &OrientedEdge, first: &OrientedEdge, via: u32, second: &OrientedEdge) -> u8 {
    let head: Vec<u32> = first
        .leading
        .iter()
        .chain(iter::once(&via))
        .chain(&second.leading)
        .copied()
        .take(edge.leading.len())
        .collect();
    let tail: Vec<u32> = first.trailing.iter().chain(iter::once(&via)).chain(&second.trailing).copied().collect();
    let tail = &tail[tail.len().saturating_sub(edge.trailing.len())..];
    u8::from(head != edge.leading) + u8::from(tail != edge.trailing.as_slice())
}
