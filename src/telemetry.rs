use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset: quiet dependencies, but keep the
/// per-operation `push`/`pull`/`delete` events from this crate visible.
const DEFAULT_FILTER: &str = "info,prioq=debug";

/// Initialize the tracing subscriber for structured logging.
///
/// - Debug builds: pretty-printed human-readable output
/// - Release builds: JSON-formatted output for log aggregation
///
/// The log level is controlled by the `RUST_LOG` environment variable,
/// falling back to [`DEFAULT_FILTER`]. Safe to call more than once: when a
/// subscriber is already installed (an embedding application, a test binary
/// initializing per-test) the existing one is kept.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let installed = if cfg!(debug_assertions) {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    };
    let _ = installed;
}
