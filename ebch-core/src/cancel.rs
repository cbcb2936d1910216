//! Cooperative cancellation.
use std::sync::atomic::{
    AtomicBool,
    Ordering,
};
use std::sync::Arc;

/// A cheaply clonable flag shared between a long-running task and whoever may want to stop it.
///
/// Cancellation is cooperative: the task polls [`CancellationToken::is_cancelled`] at points where
/// stopping leaves its state consistent.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    /// Set once cancellation is requested.
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token nobody has cancelled yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of a clone to stop.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether [`cancel`](Self::cancel) was called on this token or a clone of it.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
#[allow(clippy::missing_docs_in_private_items)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
