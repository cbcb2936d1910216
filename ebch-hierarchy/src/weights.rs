//! Weight handlers: the seam between edge payloads and whatever cost model produced them.
//!
//! The graph only stores words.  A [`WeightHandler`] knows how many fixed words an edge carries,
//! how to pack a weight and a direction into them, and how to read them back.  All searches work on
//! the scalar [`EdgeWeight::value`]; handlers may carry extra metrics alongside it.
use std::fmt::Debug;

use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::GraphError;
use crate::graph::{
    self,
    Direction,
};
use crate::model::Segment;

/// A weight that can be summed along a path and compared by its scalar value.
pub trait EdgeWeight: Copy + Debug + PartialEq {
    /// The value searches minimise.
    fn value(&self) -> f32;

    /// The weight of travelling `self` and then `other`.
    #[must_use]
    fn combine(self, other: Self) -> Self;
}

impl EdgeWeight for f32 {
    fn value(&self) -> f32 {
        *self
    }

    fn combine(self, other: Self) -> Self {
        self + other
    }
}

/// Packs and unpacks the fixed part of edge payloads.
pub trait WeightHandler {
    /// What the fixed words decode to.
    type Weight: EdgeWeight;

    /// Fixed words per edge.
    fn fixed_size(&self) -> usize;

    /// Pack `weight` and `direction` into [`fixed_size`](Self::fixed_size) words.
    fn encode(&self, weight: Self::Weight, direction: Direction) -> Result<Vec<u32>, GraphError>;

    /// Unpack what [`encode`](Self::encode) wrote.
    fn decode(&self, fixed: &[u32]) -> (Self::Weight, Direction);

    /// The weight of a road segment when no other cost function is supplied.
    fn segment_weight(&self, segment: &Segment) -> Self::Weight;

    /// The scalar weight and direction of an edge.
    fn weight(&self, fixed: &[u32]) -> (f32, Direction) {
        let (weight, direction) = self.decode(fixed);
        (weight.value(), direction)
    }

    /// Round-trip a weight through the encoding so it compares exactly with stored weights.
    fn quantize(&self, weight: Self::Weight) -> Result<Self::Weight, GraphError> {
        Ok(self.decode(&self.encode(weight, Direction::Both)?).0)
    }
}

/// A single `f32` weight in one fixed word.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultWeightHandler;

impl WeightHandler for DefaultWeightHandler {
    type Weight = f32;

    fn fixed_size(&self) -> usize {
        1
    }

    fn encode(&self, weight: f32, direction: Direction) -> Result<Vec<u32>, GraphError> {
        Ok(vec![graph::serialize(weight, direction)?])
    }

    fn decode(&self, fixed: &[u32]) -> (f32, Direction) {
        graph::deserialize(fixed.first().copied().unwrap_or_default())
    }

    fn segment_weight(&self, segment: &Segment) -> f32 {
        segment.weight
    }
}

/// Weight plus distance and travel time.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct AugmentedWeight {
    /// The value searches minimise.
    pub weight: f32,
    /// Length of the travelled segments.
    pub distance: f32,
    /// Travel time over the segments.
    pub time: f32,
}

impl EdgeWeight for AugmentedWeight {
    fn value(&self) -> f32 {
        self.weight
    }

    fn combine(self, other: Self) -> Self {
        Self {
            weight: self.weight + other.weight,
            distance: self.distance + other.distance,
            time: self.time + other.time,
        }
    }
}

/// Three fixed words: the packed weight and direction, then distance and time.
#[derive(Clone, Copy, Debug, Default)]
pub struct AugmentedWeightHandler;

impl WeightHandler for AugmentedWeightHandler {
    type Weight = AugmentedWeight;

    fn fixed_size(&self) -> usize {
        3
    }

    fn encode(&self, weight: AugmentedWeight, direction: Direction) -> Result<Vec<u32>, GraphError> {
        Ok(vec![
            graph::serialize(weight.weight, direction)?,
            graph::serialize_metric(weight.distance)?,
            graph::serialize_metric(weight.time)?,
        ])
    }

    fn decode(&self, fixed: &[u32]) -> (AugmentedWeight, Direction) {
        let (weight, direction) = graph::deserialize(fixed.first().copied().unwrap_or_default());
        let distance = graph::deserialize_metric(fixed.get(1).copied().unwrap_or_default());
        let time = graph::deserialize_metric(fixed.get(2).copied().unwrap_or_default());
        (AugmentedWeight { weight, distance, time }, direction)
    }

    fn segment_weight(&self, segment: &Segment) -> AugmentedWeight {
        AugmentedWeight {
            weight: segment.weight,
            distance: segment.distance.unwrap_or_default(),
            time: segment.time.unwrap_or_default(),
        }
    }
}
