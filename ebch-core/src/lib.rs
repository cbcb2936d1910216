#![deny(
    // This is overly strict, of course. The intent is somewhat of a "quality seal," less to fix everything, and more to force us to add inline allows, which are even more needlessly verbose, but give us a mechanism to say "we think this is okay, but you might want to take a second look here."
    clippy::nursery,
    clippy::pedantic,
    // These are also just for clinic purposes
    missing_docs,
    clippy::missing_docs_in_private_items,
)]
//! Shared plumbing for the `ebch-*` crates: logging setup, error conventions, and the cooperative
//! cancellation token used by long-running preprocessing.

/// Cooperative cancellation.
pub mod cancel;
/// Error conventions and the `anyhow` re-exports.
pub mod errors;
/// Tracing subscriber setup.
pub mod logging;

pub use cancel::CancellationToken;
