//! Tracing subscriber setup
//!
//! The library only emits `tracing` events; binaries and tests opt in to
//! output with [`init_tracing`]. The filter is read from `RUST_LOG` and
//! falls back to `info` for this crate.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "expfactory_credit=info";

/// Install a formatting subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    // A global subscriber may already be set by another test
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init_tracing();
        init_tracing();
        tracing::info!("tracing initialised");
    }
}
