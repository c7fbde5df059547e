//! Log output setup
//!
//! The library only emits `tracing` events. Binaries and tests that want them
//! printed call [`init`] once at startup.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "downlink=info";

/// Install a formatting subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_FILTER`].
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    install(filter)
}

/// Install a formatting subscriber with an explicit filter directive such as
/// `downlink::delivery=debug,downlink=info`.
pub fn init_with_filter(directives: &str) -> bool {
    install(EnvFilter::new(directives))
}

fn install(filter: EnvFilter) -> bool {
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}
