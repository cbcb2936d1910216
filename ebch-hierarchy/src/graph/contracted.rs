use super::codec::{
    self,
    Direction,
    EdgeKind,
};
use super::dynamic::{
    DirectedDynamicGraph,
    EdgeView,
};
use crate::errors::GraphError;
use crate::weights::{
    EdgeWeight,
    WeightHandler,
};

/// A decoded edge payload, as seen from the vertex that stores it.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeData<W> {
    /// Weight of the edge.
    pub weight: W,
    /// Travel directions relative to the storing vertex.
    pub direction: Direction,
    /// Original segment or shortcut.
    pub kind: EdgeKind,
}

impl<W: EdgeWeight> EdgeData<W> {
    /// Payload of an input segment.
    pub const fn original(weight: W, direction: Direction) -> Self {
        Self { weight, direction, kind: EdgeKind::Original }
    }

    /// Payload of a shortcut around `contracted`.
    pub fn shortcut(weight: W, direction: Direction, contracted: u32, sequence1: Vec<u32>, sequence2: Vec<u32>) -> Self {
        Self { weight, direction, kind: EdgeKind::shortcut(contracted, sequence1, sequence2) }
    }

    /// Decode the payload of a stored edge.
    pub fn read<H: WeightHandler<Weight = W>>(handler: &H, edge: &EdgeView<'_>) -> Result<Self, GraphError> {
        let (weight, direction) = handler.decode(edge.fixed());
        Ok(Self { weight, direction, kind: edge.kind()? })
    }

    /// The payload to store at the other endpoint.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self { weight: self.weight, direction: self.direction.reverse(), kind: self.kind.reversed() }
    }
}

/// How many edge records an update removed and added at the updated vertex.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EdgeUpdate {
    /// Records written.
    pub added: usize,
    /// Records deleted.
    pub removed: usize,
}

impl EdgeUpdate {
    /// Whether the update touched the graph at all.
    pub const fn changed(&self) -> bool {
        self.added > 0 || self.removed > 0
    }
}

/// Encode `data` and store it at `from`, pointing to `to`.
///
/// Sequences equal to `[contracted]` are stored implicitly.
pub fn add_edge<H: WeightHandler>(
    graph: &mut DirectedDynamicGraph,
    handler: &H,
    from: u32,
    to: u32,
    data: &EdgeData<H::Weight>,
) -> Result<u32, GraphError> {
    let fixed = handler.encode(data.weight, data.direction)?;
    let dynamic = codec::encode_dynamic(&data.kind);
    graph.add_edge(from, to, &fixed, &dynamic)
}

/// Insert `data` at `from` unless the edges already stored towards `to` are at least as good.
///
/// Only edges between the same pair are compared, and with `match_hops` only those that store the
/// same original vertices next to `from` and next to `to`.  For each travel direction the
/// lighter edge wins; the winners are written back as a single bidirectional edge when their
/// weight and content are identical, as two one-way edges otherwise.  Calling this again with a
/// payload that is no improvement leaves the graph untouched.
pub fn add_or_update_edge<H: WeightHandler>(
    graph: &mut DirectedDynamicGraph,
    handler: &H,
    from: u32,
    to: u32,
    data: &EdgeData<H::Weight>,
    match_hops: bool,
) -> Result<EdgeUpdate, GraphError> {
    let weight = handler.quantize(data.weight)?;
    let sequences = match_hops.then(|| data.kind.sequences());

    let mut forward: Option<EdgeData<H::Weight>> = None;
    let mut backward: Option<EdgeData<H::Weight>> = None;
    for edge in graph.edges(from).filter(|edge| matches(edge, to, sequences.as_ref())) {
        let existing = EdgeData::read(handler, &edge)?;
        if existing.direction.forward() && is_lighter(&existing.weight, forward.as_ref()) {
            forward = Some(EdgeData { direction: Direction::Forward, ..existing.clone() });
        }
        if existing.direction.backward() && is_lighter(&existing.weight, backward.as_ref()) {
            backward = Some(EdgeData { direction: Direction::Backward, ..existing });
        }
    }

    let improves_forward = data.direction.forward() && is_lighter(&weight, forward.as_ref());
    let improves_backward = data.direction.backward() && is_lighter(&weight, backward.as_ref());
    if !improves_forward && !improves_backward {
        return Ok(EdgeUpdate::default());
    }
    if improves_forward {
        forward = Some(EdgeData { weight, direction: Direction::Forward, kind: data.kind.clone() });
    }
    if improves_backward {
        backward = Some(EdgeData { weight, direction: Direction::Backward, kind: data.kind.clone() });
    }

    let removed = graph.retain_edges(from, |edge| !matches(edge, to, sequences.as_ref()));
    let mut added = 0;
    match (forward, backward) {
        (Some(forward), Some(backward)) if forward.weight == backward.weight && forward.kind == backward.kind => {
            add_edge(graph, handler, from, to, &EdgeData { direction: Direction::Both, ..forward })?;
            added += 1;
        },
        (forward, backward) => {
            for edge in [forward, backward].into_iter().flatten() {
                add_edge(graph, handler, from, to, &edge)?;
                added += 1;
            }
        },
    }

    Ok(EdgeUpdate { added, removed })
}

/// Whether a stored edge competes with a new edge towards `to` carrying `sequences`.
fn matches(edge: &EdgeView<'_>, to: u32, sequences: Option<&(Vec<u32>, Vec<u32>)>) -> bool {
    edge.neighbour() == to
        && sequences.map_or(true, |(leading, trailing)| edge.leading() == *leading && edge.trailing() == *trailing)
}

/// Whether `weight` beats the best edge found so far.
fn is_lighter<W: EdgeWeight>(weight: &W, best: Option<&EdgeData<W>>) -> bool {
    best.map_or(true, |best| weight.value() < best.weight.value())
}
