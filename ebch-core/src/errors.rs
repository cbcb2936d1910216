//! Error conventions shared across the workspace.
//!
//! Library crates define typed `thiserror` enums for their contract violations; application code
//! propagates everything through `anyhow`, imported from here.

pub use anyhow::{
    anyhow,
    bail,
    ensure,
    Context,
    Result,
};
pub use thiserror::Error;

/// Result type for operations that produce nothing but can fail.
pub type EmptyResult = anyhow::Result<()>;

#[cfg(test)]
#[allow(clippy::missing_docs_in_private_items)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    enum FakeError {
        #[error("broken: {0}")]
        Broken(u32),
    }

    fn fails() -> EmptyResult {
        bail!(FakeError::Broken(3))
    }

    #[test]
    fn test_empty_result_carries_typed_error() {
        let err = fails().unwrap_err();
        assert!(matches!(err.downcast_ref::<FakeError>(), Some(FakeError::Broken(3))));
        assert_eq!(err.to_string(), "broken: 3");
    }
}
