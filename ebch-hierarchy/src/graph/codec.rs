//! Packing of edge payloads into `u32` words.
//!
//! Every edge carries a fixed part and a dynamic part.  Word 0 of the fixed part holds the weight
//! in fixed point (one decimal) shifted left by two bits, with the travel direction in the low two
//! bits.  The dynamic part is empty for original edges.  Shortcuts store the contracted vertex,
//! optionally followed by the length of sequence 1 and the concatenated sequences:
//!
//! ```text
//! original:  []
//! shortcut:  [contracted]                                   (both sequences implicit)
//!            [contracted, len(seq1), seq1..., seq2...]
//! ```
//!
//! A sequence equal to `[contracted]` is implicit and stored empty.
use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::GraphError;

/// Fixed-point scale used for weights and metrics.
pub const PRECISION: f32 = 10.0;

/// Largest weight that survives [`serialize`].
pub const MAX_WEIGHT: f32 = ((u32::MAX - 1) >> 2) as f32 / PRECISION;

/// Largest metric that survives [`serialize_metric`].
pub const MAX_METRIC: f32 = (u32::MAX - 1) as f32 / PRECISION;

/// Low bits of a weight word that hold the [`Direction`].
const DIRECTION_MASK: u32 = 0b11;

/// The directions an edge can be travelled in, relative to the vertex that stores it.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Both from the storing vertex to its neighbour and back.
    #[default]
    Both,
    /// Only from the storing vertex to its neighbour.
    Forward,
    /// Only from the neighbour to the storing vertex.
    Backward,
}

impl Direction {
    /// Build a direction from the two travel flags; `None` when neither is set.
    pub const fn from_flags(forward: bool, backward: bool) -> Option<Self> {
        match (forward, backward) {
            (true, true) => Some(Self::Both),
            (true, false) => Some(Self::Forward),
            (false, true) => Some(Self::Backward),
            (false, false) => None,
        }
    }

    /// Whether the edge can be travelled from the storing vertex to its neighbour.
    pub const fn forward(self) -> bool {
        matches!(self, Self::Both | Self::Forward)
    }

    /// Whether the edge can be travelled from the neighbour to the storing vertex.
    pub const fn backward(self) -> bool {
        matches!(self, Self::Both | Self::Backward)
    }

    /// The same edge seen from the other endpoint.
    #[must_use]
    pub const fn reverse(self) -> Self {
        match self {
            Self::Both => Self::Both,
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// Encoding in the low bits of a weight word.
    const fn bits(self) -> u32 {
        match self {
            Self::Both => 0,
            Self::Forward => 1,
            Self::Backward => 2,
        }
    }

    /// Decode the low bits of a weight word.
    const fn from_bits(bits: u32) -> Self {
        match bits & DIRECTION_MASK {
            1 => Self::Forward,
            2 => Self::Backward,
            _ => Self::Both,
        }
    }
}

/// Pack a weight and a direction into one word.
pub fn serialize(weight: f32, direction: Direction) -> Result<u32, GraphError> {
    if !(0.0..=MAX_WEIGHT).contains(&weight) {
        return Err(GraphError::WeightOutOfRange(weight));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let fixed = ((f64::from(weight) * f64::from(PRECISION)).round() as u64).min(u64::from(u32::MAX >> 2)) as u32;
    Ok((fixed << 2) | direction.bits())
}

/// Unpack a word written by [`serialize`].
pub fn deserialize(word: u32) -> (f32, Direction) {
    #[allow(clippy::cast_precision_loss)]
    let weight = (word >> 2) as f32 / PRECISION;
    (weight, Direction::from_bits(word))
}

/// Pack a non-negative metric (distance, time) without direction bits.
pub fn serialize_metric(value: f32) -> Result<u32, GraphError> {
    if !(0.0..=MAX_METRIC).contains(&value) {
        return Err(GraphError::WeightOutOfRange(value));
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let fixed = ((f64::from(value) * f64::from(PRECISION)).round() as u64).min(u64::from(u32::MAX)) as u32;
    Ok(fixed)
}

/// Unpack a word written by [`serialize_metric`].
pub fn deserialize_metric(word: u32) -> f32 {
    #[allow(clippy::cast_precision_loss)]
    let value = word as f32 / PRECISION;
    value
}

/// Shortcut metadata: the vertex a shortcut bypasses and the original vertices next to its ends.
///
/// Sequence 1 lists the original vertices right after the source of the shortcut, sequence 2
/// the ones right before its target, both in travel order.  A sequence equal to `[contracted]` is
/// stored empty; the accessors always return the resolved form.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Shortcut {
    /// The bypassed vertex.
    contracted: u32,
    /// Normalized sequence 1.
    sequence1: Vec<u32>,
    /// Normalized sequence 2.
    sequence2: Vec<u32>,
}

impl Shortcut {
    /// A shortcut around `contracted`; implicit sequences are normalized away.
    pub fn new(contracted: u32, sequence1: Vec<u32>, sequence2: Vec<u32>) -> Self {
        Self {
            contracted,
            sequence1: normalize(contracted, sequence1),
            sequence2: normalize(contracted, sequence2),
        }
    }

    /// The bypassed vertex.
    pub const fn contracted(&self) -> u32 {
        self.contracted
    }

    /// Original vertices right after the source, in travel order.
    pub fn sequence1(&self) -> Vec<u32> {
        self.resolve(&self.sequence1)
    }

    /// Original vertices right before the target, in travel order.
    pub fn sequence2(&self) -> Vec<u32> {
        self.resolve(&self.sequence2)
    }

    /// The same shortcut stored at its target, pointing back at its source.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut sequence1 = self.sequence2();
        let mut sequence2 = self.sequence1();
        sequence1.reverse();
        sequence2.reverse();
        Self::new(self.contracted, sequence1, sequence2)
    }

    /// Expand an implicit sequence to `[contracted]`.
    fn resolve(&self, sequence: &[u32]) -> Vec<u32> {
        if sequence.is_empty() {
            vec![self.contracted]
        } else {
            sequence.to_vec()
        }
    }
}

/// Store `[contracted]` as the empty sequence.
fn normalize(contracted: u32, sequence: Vec<u32>) -> Vec<u32> {
    if sequence == [contracted] {
        vec![]
    } else {
        sequence
    }
}

/// What an edge stands for: a road segment of the input, or a path through contracted vertices.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum EdgeKind {
    /// A segment of the input network.
    Original,
    /// A path through a contracted vertex.
    Shortcut(Shortcut),
}

impl EdgeKind {
    /// Shorthand for [`Shortcut::new`].
    pub fn shortcut(contracted: u32, sequence1: Vec<u32>, sequence2: Vec<u32>) -> Self {
        Self::Shortcut(Shortcut::new(contracted, sequence1, sequence2))
    }

    /// Whether this is an input segment.
    pub const fn is_original(&self) -> bool {
        matches!(self, Self::Original)
    }

    /// The bypassed vertex of a shortcut.
    pub const fn contracted(&self) -> Option<u32> {
        match self {
            Self::Original => None,
            Self::Shortcut(shortcut) => Some(shortcut.contracted),
        }
    }

    /// The same edge stored at its other endpoint.
    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::Original => Self::Original,
            Self::Shortcut(shortcut) => Self::Shortcut(shortcut.reversed()),
        }
    }

    /// Both resolved sequences, `([], [])` for original edges.
    pub fn sequences(&self) -> (Vec<u32>, Vec<u32>) {
        match self {
            Self::Original => (vec![], vec![]),
            Self::Shortcut(shortcut) => (shortcut.sequence1(), shortcut.sequence2()),
        }
    }
}

/// Lay out the dynamic words for an edge.
pub fn encode_dynamic(kind: &EdgeKind) -> Vec<u32> {
    match kind {
        EdgeKind::Original => vec![],
        EdgeKind::Shortcut(shortcut) if shortcut.sequence1.is_empty() && shortcut.sequence2.is_empty() => {
            vec![shortcut.contracted]
        },
        EdgeKind::Shortcut(shortcut) => {
            let mut words = Vec::with_capacity(2 + shortcut.sequence1.len() + shortcut.sequence2.len());
            words.push(shortcut.contracted);
            #[allow(clippy::cast_possible_truncation)]
            words.push(shortcut.sequence1.len() as u32);
            words.extend_from_slice(&shortcut.sequence1);
            words.extend_from_slice(&shortcut.sequence2);
            words
        },
    }
}

/// Read the dynamic words of edge `edge` back into an [`EdgeKind`].
pub fn decode_dynamic(edge: u32, words: &[u32]) -> Result<EdgeKind, GraphError> {
    match words {
        [] => Ok(EdgeKind::Original),
        [contracted] => Ok(EdgeKind::shortcut(*contracted, vec![], vec![])),
        [contracted, size, sequences @ ..] => {
            let size = *size as usize;
            if size > sequences.len() {
                return Err(GraphError::CorruptEdgeData {
                    edge,
                    reason: format!("sequence 1 claims {size} words but only {} follow", sequences.len()),
                });
            }
            let (sequence1, sequence2) = sequences.split_at(size);
            Ok(EdgeKind::shortcut(*contracted, sequence1.to_vec(), sequence2.to_vec()))
        },
    }
}

/// Sequence 1 of the edge stored as `words`, resolved: empty for original edges.
pub fn leading_sequence(words: &[u32]) -> Vec<u32> {
    match words {
        [] => vec![],
        [contracted] => vec![*contracted],
        [contracted, size, sequences @ ..] => {
            let size = (*size as usize).min(sequences.len());
            if size == 0 {
                vec![*contracted]
            } else {
                sequences[..size].to_vec()
            }
        },
    }
}

/// Sequence 2 of the edge stored as `words`, resolved: empty for original edges.
pub fn trailing_sequence(words: &[u32]) -> Vec<u32> {
    match words {
        [] => vec![],
        [contracted] => vec![*contracted],
        [contracted, size, sequences @ ..] => {
            let size = (*size as usize).min(sequences.len());
            if sequences.len() == size {
                vec![*contracted]
            } else {
                sequences[size..].to_vec()
            }
        },
    }
}
