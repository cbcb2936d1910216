#![deny(
    // This is overly strict, of course. The intent is somewhat of a "quality seal," less to fix everything, and more to force us to add inline allows, which are even more needlessly verbose, but give us a mechanism to say "we think this is okay, but you might want to take a second look here."
    clippy::nursery,
    clippy::pedantic,
    // These are also just for clinic purposes
    missing_docs,
    clippy::missing_docs_in_private_items,
)]
//! # ebch-hierarchy: turn-aware Contraction Hierarchies
//!
//! This crate answers point-to-point shortest path queries on road networks using edge-based
//! Contraction Hierarchies.  Turn restrictions and u-turns are respected both while the
//! hierarchy is built and while it is queried.
//!
//! ## Pipeline overview
//! 1. Graph building ([`RoadNetwork::build_graph`]): load segments into a
//!    [`DirectedDynamicGraph`], storing every segment at both of its endpoints.  Edge payloads are
//!    packed into `u32` words by a [`WeightHandler`](weights::WeightHandler).
//! 2. Contraction ([`HierarchyBuilder`]): contract vertices in priority order, inserting shortcuts
//!    wherever no witness path makes them redundant.  The graph is rewritten in place.
//! 3. Querying ([`BidirectionalDykstra`]): run a forward and a backward search up the hierarchy,
//!    meet in the middle and expand the shortcuts of the best route back into original vertices.
//!
//! Forbidden maneuvers are supplied through a [`RestrictionLookup`]; [`RestrictionTable`] is the
//! usual implementation.

/// Contraction: priorities, witness searches and the builder.
pub mod contraction_hierarchies;
/// Typed errors of graph access, contraction and queries.
pub mod errors;
/// The dynamic adjacency graph and its edge codec.
pub mod graph;
/// The input road network.
pub mod model;
/// Queries on a contracted graph.
pub mod query;
/// Turn restrictions and the maneuver rule.
pub mod restrictions;
/// Fixtures and reference oracles for tests.
#[cfg(any(test, feature = "testutils"))]
#[allow(clippy::missing_panics_doc)]
pub mod testutils;
/// Graph export for inspection.
pub mod utils;
/// Edge weight encoding.
pub mod weights;

pub use contraction_hierarchies::{
    ContractionParameters,
    HierarchyBuilder,
};
pub use errors::{
    BuildError,
    GraphError,
    QueryError,
};
pub use graph::DirectedDynamicGraph;
pub use model::RoadNetwork;
pub use query::{
    BidirectionalDykstra,
    Dykstra,
    EdgePath,
    Route,
};
pub use restrictions::{
    RestrictionLookup,
    RestrictionTable,
};
