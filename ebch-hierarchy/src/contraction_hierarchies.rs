//! Edge-based Contraction Hierarchies preprocessing.
//!
//! Contraction Hierarchies speeds up shortest path queries on road networks in two stages:
//! 1. Preprocessing (this module):
//!     * Score every vertex with a [`PriorityCalculator`] and repeatedly contract the vertex with the
//!       lowest score.
//!     * Contracting a vertex removes it from the remaining graph.  Every pair of its neighbours
//!       whose shortest connection ran through it gets a shortcut, unless a [`WitnessCalculator`]
//!       finds a path that is at least as good without it.
//! 2. Querying ([`crate::query`]): a bidirectional search that only moves towards vertices
//!    contracted later, meeting at the highest vertex of the route.
//!
//! The variant here is edge-based.  Each shortcut remembers the original vertices right after its
//! source and right before its target, as many as the longest restriction can reach past a vertex,
//! so searches know which original vertices they arrived from.  That is enough to forbid u-turns
//! and restricted maneuvers at every vertex of a route, including the ones hidden inside
//! shortcuts.

/// The contraction loop.
mod builder;
/// Graph access and shortcut insertion shared by scoring and contraction.
mod context;
/// Vertex ordering.
mod priority;
/// Searches for paths that make shortcuts redundant.
mod witness;


pub use builder::{
    BuilderState,
    ContractionParameters,
    HierarchyBuilder,
};
pub use context::{
    ContractionContext,
    IncidentEdge,
    ShortcutCount,
};
pub use priority::{
    EdgeDifferencePriorityCalculator,
    PriorityCalculator,
};
pub use witness::{
    DykstraWitnessCalculator,
    Witness,
    WitnessCalculator,
    WitnessSource,
    WitnessTarget,
};
