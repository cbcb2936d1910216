//! The directed dynamic graph the hierarchy is built in, and the packing of its edge payloads.
//!
//! During contraction the graph is mutated in place: shortcuts are added, edges to contracted
//! vertices are removed, and vertices are never added or removed.  Once contraction is done the
//! graph is [compressed](DirectedDynamicGraph::compress) and only read from.

/// Word layout of edge payloads.
mod codec;
/// Typed edge payloads on top of the raw graph.
mod contracted;
/// The arena-backed graph.
mod dynamic;

#[cfg(test)]
#[allow(clippy::missing_docs_in_private_items)]
mod tests;

pub use codec::{
    decode_dynamic,
    deserialize,
    deserialize_metric,
    encode_dynamic,
    serialize,
    serialize_metric,
    Direction,
    EdgeKind,
    Shortcut,
    MAX_METRIC,
    MAX_WEIGHT,
    PRECISION,
};
pub use contracted::{
    add_edge,
    add_or_update_edge,
    EdgeData,
    EdgeUpdate,
};
pub use dynamic::{
    DirectedDynamicGraph,
    DirectedEdgeId,
    EdgeView,
    Edges,
    NO_EDGE,
};

/// Sentinel for "no vertex".
pub const NO_VERTEX: u32 = u32::MAX;
