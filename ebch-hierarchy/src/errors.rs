//! Error types for graph access, hierarchy construction and queries.
//!
//! Only contract violations and corrupt data are errors here.  Negative search outcomes ("no
//! witness", "no route") are regular values: see [`Witness`](crate::contraction_hierarchies::Witness)
//! and [`QueryStatus`](crate::query::QueryStatus).
use ebch_core::errors::Error;

/// Errors raised by the dynamic graph and the code reading edges out of it.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphError {
    /// A directed edge id that is zero or does not point at an edge record.
    #[error("invalid directed edge id {0}")]
    InvalidEdgeId(i64),

    /// Shortcut data was requested from an original edge.
    #[error("edge {0} is an original edge and has no shortcut data")]
    NotAShortcut(u32),

    /// The dynamic words of an edge do not describe a valid shortcut.
    #[error("edge {edge} has corrupt data: {reason}")]
    CorruptEdgeData {
        /// Index of the offending edge.
        edge: u32,
        /// What is wrong with it.
        reason: String,
    },

    /// The fixed payload handed to the graph has the wrong number of words.
    #[error("edge payload has {actual} fixed words, graph expects {expected}")]
    FixedSizeMismatch {
        /// Fixed words per edge in this graph.
        expected: usize,
        /// Fixed words supplied.
        actual: usize,
    },

    /// A weight (or metric) that cannot be packed into an edge word.
    #[error("weight {0} is out of the encodable range")]
    WeightOutOfRange(f32),

    /// A vertex id beyond the vertices the graph was built for.
    #[error("vertex {0} is out of range")]
    VertexOutOfRange(u32),

    /// No pair of component edges reproduces a shortcut during path expansion.
    #[error("cannot expand shortcut {from} -> {to} via {via}")]
    ExpansionFailed {
        /// Source vertex of the shortcut.
        from: u32,
        /// Target vertex of the shortcut.
        to: u32,
        /// The contracted vertex the shortcut bypasses.
        via: u32,
    },
}

/// Errors raised while building the hierarchy.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BuildError {
    /// The cancellation token fired; every vertex contracted so far is fully contracted.
    #[error("contraction was cancelled")]
    Cancelled,

    /// Reading or writing the graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors raised by the shortest-path queries.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum QueryError {
    /// Results were requested before the query ran.
    #[error("query has not been run")]
    NotRun,

    /// Results were requested from a query that found no route.
    #[error("query found no route")]
    NoRoute,

    /// Reading or writing the graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
