use std::iter;

use fixedbitset::FixedBitSet;
use tracing::trace;

use super::witness::{
    Witness,
    WitnessCalculator,
    WitnessSource,
    WitnessTarget,
};
use crate::errors::GraphError;
use crate::graph::{
    add_or_update_edge,
    DirectedDynamicGraph,
    Direction,
    EdgeData,
};
use crate::restrictions::{
    extend_history,
    is_legal_joint,
    leading_vertices,
    restriction_flags,
    RestrictionLookup,
};
use crate::weights::{
    EdgeWeight,
    WeightHandler,
};

/// One edge incident to a vertex under evaluation, seen from that vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct IncidentEdge<W> {
    /// The other endpoint.
    pub neighbour: u32,
    /// Weight of the edge.
    pub weight: W,
    /// Direction relative to `vertex -> neighbour`.
    pub direction: Direction,
    /// Stored original vertices right after the evaluated vertex; empty for original edges.
    pub leading: Vec<u32>,
    /// Stored original vertices right before `neighbour`; empty for original edges.
    pub trailing: Vec<u32>,
}

/// Shortcut bookkeeping for one vertex.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ShortcutCount {
    /// Shortcut directions the vertex needs, counted per travel direction.
    pub needed: usize,
    /// Edge records written at the neighbours.
    pub added: usize,
    /// Edge records replaced at the neighbours.
    pub removed: usize,
}

/// Everything contraction reads and writes besides the priorities: the graph being contracted,
/// the cost and restriction lookups, the witness calculator and the per-vertex flags.
pub struct ContractionContext<'a, H, R: ?Sized, W> {
    /// The graph being contracted.
    graph: &'a mut DirectedDynamicGraph,
    /// Encodes and decodes edge weights.
    handler: &'a H,
    /// Decides which maneuvers are legal.
    restrictions: &'a R,
    /// Finds paths that make shortcuts redundant.
    witness: W,
    /// Vertices already contracted.
    contracted: FixedBitSet,
    /// Vertices where exact entry and exit vertices matter.
    restricted: FixedBitSet,
    /// Shortcut records written so far.
    shortcuts_added: usize,
}

impl<'a, H, R, W> ContractionContext<'a, H, R, W>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
    W: WitnessCalculator,
{
    /// A context over `graph` with nothing contracted yet.
    pub fn new(graph: &'a mut DirectedDynamicGraph, handler: &'a H, restrictions: &'a R, witness: W) -> Self {
        let restricted = restriction_flags(graph, restrictions);
        let contracted = FixedBitSet::with_capacity(graph.vertex_count() as usize);
        Self { graph, handler, restrictions, witness, contracted, restricted, shortcuts_added: 0 }
    }

    /// The graph being contracted.
    pub fn graph(&self) -> &DirectedDynamicGraph {
        &*self.graph
    }

    /// Mutable access to the graph being contracted.
    pub(crate) fn graph_mut(&mut self) -> &mut DirectedDynamicGraph {
        &mut *self.graph
    }

    /// The weight handler.
    pub const fn handler(&self) -> &H {
        self.handler
    }

    /// Whether `vertex` has been contracted.
    pub fn is_contracted(&self, vertex: u32) -> bool {
        self.contracted.contains(vertex as usize)
    }

    /// Whether exact entry and exit vertices matter at `vertex`.
    pub fn is_restricted(&self, vertex: u32) -> bool {
        self.restricted.contains(vertex as usize)
    }

    /// Every contracted vertex.
    pub const fn contracted(&self) -> &FixedBitSet {
        &self.contracted
    }

    /// Shortcut records written so far, by scoring and by contraction, counting both stored copies.
    pub const fn shortcuts_added(&self) -> usize {
        self.shortcuts_added
    }

    /// Record that `vertex` is contracted.
    pub(crate) fn mark_contracted(&mut self, vertex: u32) {
        self.contracted.insert(vertex as usize);
    }

    /// Drop the edges at `vertex` that still point to contracted vertices.
    pub fn remove_contracted_neighbours(&mut self, vertex: u32) -> usize {
        let contracted = &self.contracted;
        self.graph.retain_edges(vertex, |edge| !contracted.contains(edge.neighbour() as usize))
    }

    /// Every edge stored at `vertex`, decoded.
    pub fn incident_edges(&self, vertex: u32) -> Result<Vec<IncidentEdge<H::Weight>>, GraphError> {
        let mut edges = vec![];
        for edge in self.graph.edges(vertex) {
            let data = EdgeData::read(self.handler, &edge)?;
            edges.push(IncidentEdge {
                neighbour: edge.neighbour(),
                weight: data.weight,
                direction: data.direction,
                leading: edge.leading(),
                trailing: edge.trailing(),
            });
        }
        Ok(edges)
    }

    /// Add every shortcut through `vertex` that no witness path makes redundant.
    ///
    /// Each pair of incident edges `(x, y)` is a candidate in the directions both edges allow and
    /// the maneuver at `vertex` permits.  Witnesses are searched from `x` without passing `skip`,
    /// and the needed shortcuts are stored at both `x` and `y`.
    pub fn add_shortcuts(
        &mut self,
        vertex: u32,
        edges: &[IncidentEdge<H::Weight>],
        skip: Option<u32>,
    ) -> Result<ShortcutCount, GraphError> {
        let history_len = self.restrictions.history_len();
        let mut count = ShortcutCount::default();
        for (i, first) in edges.iter().enumerate() {
            let mut candidates = vec![];
            for second in &edges[i + 1..] {
                if first.neighbour == second.neighbour {
                    continue;
                }

                let towards_first = leading_vertices(&first.leading, first.neighbour, history_len);
                let towards_second = leading_vertices(&second.leading, second.neighbour, history_len);
                let into_second = first.direction.backward()
                    && second.direction.forward()
                    && is_legal_joint(self.restrictions, &reversed(&towards_first), vertex, &towards_second);
                let into_first = second.direction.backward()
                    && first.direction.forward()
                    && is_legal_joint(self.restrictions, &reversed(&towards_second), vertex, &towards_first);
                if !into_second && !into_first {
                    continue;
                }

                let (sequence1, sequence2) = shortcut_sequences(first, vertex, second, history_len);
                let weight = first.weight.combine(second.weight);
                candidates.push(Candidate {
                    lead: self
                        .is_restricted(first.neighbour)
                        .then(|| leading_vertices(&sequence1, second.neighbour, history_len)),
                    target: WitnessTarget {
                        vertex: second.neighbour,
                        trail: self
                            .is_restricted(second.neighbour)
                            .then(|| extend_history(&[], first.neighbour, &sequence2, history_len)),
                        max_weight: weight.value(),
                    },
                    forward: if into_second { Witness::Unknown } else { Witness::NotRequired },
                    backward: if into_first { Witness::Unknown } else { Witness::NotRequired },
                    second,
                    weight,
                    sequence1,
                    sequence2,
                });
            }
            if candidates.is_empty() {
                continue;
            }

            self.find_witnesses(first.neighbour, &mut candidates, skip);

            for candidate in candidates {
                let (forward, backward) = (candidate.forward, candidate.backward);
                let Some(direction) = Direction::from_flags(forward.is_missing(), backward.is_missing()) else {
                    continue;
                };
                count.needed += usize::from(forward.is_missing()) + usize::from(backward.is_missing());

                let to = candidate.second.neighbour;
                let shortcut =
                    EdgeData::shortcut(candidate.weight, direction, vertex, candidate.sequence1, candidate.sequence2);
                let match_hops = self.is_restricted(first.neighbour) || self.is_restricted(to);
                trace!(from = first.neighbour, to, via = vertex, ?direction, "shortcut needed");

                for (from, to, data) in
                    [(first.neighbour, to, shortcut.clone()), (to, first.neighbour, shortcut.reversed())]
                {
                    let update = add_or_update_edge(&mut *self.graph, self.handler, from, to, &data, match_hops)?;
                    count.added += update.added;
                    count.removed += update.removed;
                }
            }
        }
        self.shortcuts_added += count.added;
        Ok(count)
    }

    /// Run the witness searches from `source` for every candidate, one search per distinct lead.
    fn find_witnesses(&self, source: u32, candidates: &mut [Candidate<'_, H::Weight>], skip: Option<u32>) {
        let mut groups: Vec<(Option<Vec<u32>>, Vec<usize>)> = vec![];
        for (index, candidate) in candidates.iter().enumerate() {
            match groups.iter_mut().find(|(lead, _)| *lead == candidate.lead) {
                Some((_, members)) => members.push(index),
                None => groups.push((candidate.lead.clone(), vec![index])),
            }
        }

        for (lead, members) in groups {
            let targets: Vec<WitnessTarget> = members.iter().map(|&i| candidates[i].target.clone()).collect();
            let mut forward: Vec<Witness> = members.iter().map(|&i| candidates[i].forward).collect();
            let mut backward: Vec<Witness> = members.iter().map(|&i| candidates[i].backward).collect();
            self.witness.calculate(
                &*self.graph,
                self.handler,
                self.restrictions,
                &WitnessSource { vertex: source, lead },
                &targets,
                skip,
                &mut forward,
                &mut backward,
            );
            for (&i, (forward, backward)) in members.iter().zip(forward.into_iter().zip(backward)) {
                candidates[i].forward = forward;
                candidates[i].backward = backward;
            }
        }
    }
}

/// A possible shortcut from the neighbour of one incident edge to the neighbour of another.
struct Candidate<'e, W> {
    /// The edge towards the far end of the shortcut.
    second: &'e IncidentEdge<W>,
    /// Weight of the path through the evaluated vertex.
    weight: W,
    /// Original vertices right after the near end.
    sequence1: Vec<u32>,
    /// Original vertices right before the far end.
    sequence2: Vec<u32>,
    /// The lead a witness has to share with the shortcut, when it matters.
    lead: Option<Vec<u32>>,
    /// The far end, as a witness target.
    target: WitnessTarget,
    /// Witness state from the near end to the far end.
    forward: Witness,
    /// Witness state from the far end to the near end.
    backward: Witness,
}

/// The original vertices of the path `first.neighbour -> vertex -> second.neighbour` right after
/// its start and right before its end, at most `len` of each.
fn shortcut_sequences<W>(first: &IncidentEdge<W>, vertex: u32, second: &IncidentEdge<W>, len: usize) -> (Vec<u32>, Vec<u32>) {
    let sequence1 = first
        .trailing
        .iter()
        .rev()
        .chain(iter::once(&vertex))
        .chain(&second.leading)
        .copied()
        .take(len)
        .collect();
    let tail: Vec<u32> = first.leading.iter().rev().chain(iter::once(&vertex)).chain(&second.trailing).copied().collect();
    let sequence2 = tail[tail.len().saturating_sub(len)..].to_vec();
    (sequence1, sequence2)
}

/// `vertices` back to front.
fn reversed(vertices: &[u32]) -> Vec<u32> {
    vertices.iter().rev().copied().collect()
}
