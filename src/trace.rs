//! Log output.

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber filtered by `directives`.
///
/// Malformed directives fall back to the `pushbench=info` default. Does
/// nothing if a global subscriber is already set.
pub fn init(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|err| {
        eprintln!("invalid log filter {:?}: {}", directives, err);
        EnvFilter::new(DEFAULT_FILTER)
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Filter used when none is configured.
pub const DEFAULT_FILTER: &str = "pushbench=info";
