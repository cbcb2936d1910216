//! Tracing subscriber setup for the binaries.
use tracing_subscriber::EnvFilter;

/// Install a compact `fmt` subscriber filtered at `verbosity` (`trace`, `debug`, `info`, ...).
///
/// `RUST_LOG` wins over `verbosity` when it is set.  Calling this more than once is harmless; only
/// the first subscriber is installed.
pub fn setup(verbosity: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
