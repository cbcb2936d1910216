use std::cmp::Reverse;
use std::collections::{
    BinaryHeap,
    HashSet,
};

use ordered_float::OrderedFloat;
use tracing::trace;

use crate::graph::DirectedDynamicGraph;
use crate::restrictions::{
    extend_history,
    is_legal_joint,
    leading_vertices,
    RestrictionLookup,
};
use crate::weights::WeightHandler;

/// The outcome of a witness search for one target in one direction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Witness {
    /// The caller does not need this direction; the calculator leaves it alone.
    NotRequired,
    /// Still to be decided.
    Unknown,
    /// A path within the weight bound exists; the candidate shortcut is redundant.
    Found {
        /// Weight of the cheapest path found.
        weight: f32,
    },
    /// No path within the bound was found; the candidate shortcut is needed.
    Missing,
}

impl Witness {
    /// Whether a path within the bound was found.
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Whether the search came up empty.
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }
}

/// Where a witness search starts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WitnessSource {
    /// The start vertex.
    pub vertex: u32,
    /// When set, the original vertices right after `vertex` on a witness have to be exactly
    /// these, in search order.  A lead shorter than the history length ends at the target.
    pub lead: Option<Vec<u32>>,
}

/// A vertex a witness search has to reach, and the weight it has to beat.
#[derive(Clone, Debug, PartialEq)]
pub struct WitnessTarget {
    /// The vertex to reach.
    pub vertex: u32,
    /// When set, the original vertices right before `vertex` on a witness have to be exactly
    /// these, in search order.
    pub trail: Option<Vec<u32>>,
    /// A witness heavier than this does not count.
    pub max_weight: f32,
}

/// Decides which candidate shortcuts are redundant.
pub trait WitnessCalculator {
    /// Search paths from `source` to every target (`forward`) and from every target to `source`
    /// (`backward`), never passing through `skip`.
    ///
    /// Entries preset to [`Witness::NotRequired`] are left alone; every other entry ends up either
    /// [`Witness::Found`] or [`Witness::Missing`].
    #[allow(clippy::too_many_arguments)]
    fn calculate<H, R>(
        &self,
        graph: &DirectedDynamicGraph,
        handler: &H,
        restrictions: &R,
        source: &WitnessSource,
        targets: &[WitnessTarget],
        skip: Option<u32>,
        forward: &mut [Witness],
        backward: &mut [Witness],
    ) where
        H: WeightHandler,
        R: RestrictionLookup + ?Sized;
}

/// A bounded Dykstra search over (vertex, recent original vertices) states.
///
/// `max_hops` limits the number of edges on a witness path and `max_settles` the number of
/// states settled per direction.  Both trade shortcut count for speed: a bounded search may miss a
/// witness and add a superfluous shortcut, but never drops a needed one.
#[derive(Clone, Copy, Debug)]
pub struct DykstraWitnessCalculator {
    /// Most edges on a witness path.
    pub max_hops: u32,
    /// Most states settled per search direction.
    pub max_settles: u32,
}

impl Default for DykstraWitnessCalculator {
    fn default() -> Self {
        Self { max_hops: u32::MAX, max_settles: u32::MAX }
    }
}

impl DykstraWitnessCalculator {
    /// A calculator with the given bounds.
    pub const fn new(max_hops: u32, max_settles: u32) -> Self {
        Self { max_hops, max_settles }
    }
}

/// A search state.  Sequences are kept in search order, whichever direction the search runs.
#[derive(Clone, Eq, Ord, PartialEq, PartialOrd)]
struct State {
    /// Weight from the source.
    weight: OrderedFloat<f32>,
    /// The reached vertex.
    vertex: u32,
    /// Edges walked so far.
    hops: u32,
    /// The original vertices right before `vertex`.
    history: Vec<u32>,
    /// The original vertices right after the source, tracked only while the lead is pinned.
    lead: Vec<u32>,
}

impl WitnessCalculator for DykstraWitnessCalculator {
    fn calculate<H, R>(
        &self,
        graph: &DirectedDynamicGraph,
        handler: &H,
        restrictions: &R,
        source: &WitnessSource,
        targets: &[WitnessTarget],
        skip: Option<u32>,
        forward: &mut [Witness],
        backward: &mut [Witness],
    ) where
        H: WeightHandler,
        R: RestrictionLookup + ?Sized,
    {
        let history_len = restrictions.history_len();
        let search = Search { calculator: self, graph, handler, restrictions, source, targets, skip, history_len };
        search.run(true, forward);
        search.run(false, backward);
    }
}

/// One witness search, run once per direction.
struct Search<'a, H, R: ?Sized> {
    /// Search bounds.
    calculator: &'a DykstraWitnessCalculator,
    /// The graph being contracted.
    graph: &'a DirectedDynamicGraph,
    /// Decodes edge weights.
    handler: &'a H,
    /// Decides which maneuvers are legal.
    restrictions: &'a R,
    /// Where the search starts.
    source: &'a WitnessSource,
    /// Where the search has to get to.
    targets: &'a [WitnessTarget],
    /// The vertex under contraction.
    skip: Option<u32>,
    /// Original vertices remembered on each side of a vertex.
    history_len: usize,
}

impl<H, R> Search<'_, H, R>
where
    H: WeightHandler,
    R: RestrictionLookup + ?Sized,
{
    /// Settle states until every open target is decided or the bounds are hit.
    fn run(&self, forward: bool, witnesses: &mut [Witness]) {
        let mut open = 0;
        let mut bound = f32::NEG_INFINITY;
        for (witness, target) in witnesses.iter_mut().zip(self.targets) {
            if *witness == Witness::NotRequired {
                continue;
            }
            *witness = Witness::Unknown;
            open += 1;
            bound = bound.max(target.max_weight);
        }
        if open == 0 {
            return;
        }

        let mut heap = BinaryHeap::new();
        for edge in self.graph.edges(self.source.vertex) {
            let (weight, direction) = self.handler.weight(edge.fixed());
            if (forward && !direction.forward()) || (!forward && !direction.backward()) {
                continue;
            }
            let neighbour = edge.neighbour();
            if self.is_skipped(neighbour) || weight > bound {
                continue;
            }
            let lead = self.extend_lead(&[], &leading_vertices(&edge.leading(), neighbour, self.history_len));
            if !self.fits_lead(&lead) {
                continue;
            }
            heap.push(Reverse(State {
                weight: OrderedFloat(weight),
                vertex: neighbour,
                hops: 1,
                history: extend_history(&[], self.source.vertex, &edge.trailing(), self.history_len),
                lead,
            }));
        }

        let mut settled = HashSet::new();
        let mut settles = 0;
        while let Some(Reverse(state)) = heap.pop() {
            if state.weight.0 > bound || settles >= self.calculator.max_settles {
                break;
            }
            if !settled.insert((state.vertex, state.history.clone(), state.lead.clone())) {
                continue;
            }
            settles += 1;

            for (witness, target) in witnesses.iter_mut().zip(self.targets) {
                if *witness != Witness::Unknown || target.vertex != state.vertex {
                    continue;
                }
                if target.trail.as_ref().is_some_and(|trail| *trail != state.history) {
                    continue;
                }
                if self.source.lead.as_ref().is_some_and(|lead| *lead != state.lead) {
                    continue;
                }
                *witness = if state.weight.0 <= target.max_weight {
                    Witness::Found { weight: state.weight.0 }
                } else {
                    Witness::Missing
                };
                open -= 1;
            }
            if open == 0 {
                break;
            }
            if state.hops >= self.calculator.max_hops {
                continue;
            }

            self.relax(forward, &state, bound, &mut heap);
        }

        for witness in witnesses.iter_mut().filter(|witness| **witness == Witness::Unknown) {
            *witness = Witness::Missing;
        }
        trace!(source = self.source.vertex, forward, settles, "witness search done");
    }

    /// Push every legal continuation of `state` within `bound`.
    fn relax(&self, forward: bool, state: &State, bound: f32, heap: &mut BinaryHeap<Reverse<State>>) {
        for edge in self.graph.edges(state.vertex) {
            let (weight, direction) = self.handler.weight(edge.fixed());
            if (forward && !direction.forward()) || (!forward && !direction.backward()) {
                continue;
            }
            let neighbour = edge.neighbour();
            if neighbour == self.source.vertex || self.is_skipped(neighbour) {
                continue;
            }

            // backward searches walk the route from its end, so both sides read the other way round
            let next = leading_vertices(&edge.leading(), neighbour, self.history_len);
            let legal = if forward {
                is_legal_joint(self.restrictions, &state.history, state.vertex, &next)
            } else {
                let before: Vec<u32> = next.iter().rev().copied().collect();
                let after: Vec<u32> = state.history.iter().rev().copied().collect();
                is_legal_joint(self.restrictions, &before, state.vertex, &after)
            };
            if !legal {
                continue;
            }

            let lead = self.extend_lead(&state.lead, &next);
            if !self.fits_lead(&lead) {
                continue;
            }

            let total = state.weight.0 + weight;
            if total <= bound {
                heap.push(Reverse(State {
                    weight: OrderedFloat(total),
                    vertex: neighbour,
                    hops: state.hops + 1,
                    history: extend_history(&state.history, state.vertex, &edge.trailing(), self.history_len),
                    lead,
                }));
            }
        }
    }

    /// The lead after walking on from `lead` over an edge whose first original vertices are
    /// `next`; nothing is tracked unless the source pins its lead.
    fn extend_lead(&self, lead: &[u32], next: &[u32]) -> Vec<u32> {
        if self.source.lead.is_none() || lead.len() >= self.history_len {
            return lead.to_vec();
        }
        lead.iter().chain(next).copied().take(self.history_len).collect()
    }

    /// Whether a path starting with `lead` can still match the pinned lead.
    fn fits_lead(&self, lead: &[u32]) -> bool {
        self.source.lead.as_ref().map_or(true, |required| required.starts_with(lead))
    }

    /// Whether `vertex` is the one under contraction.
    fn is_skipped(&self, vertex: u32) -> bool {
        self.skip == Some(vertex)
    }
}
