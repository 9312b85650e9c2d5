//! Logging setup for the CLI and server

use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVES: &str = "qms_metrics=info,qms_metrics_lib=info,tower_http=info";

/// Install the global subscriber. Logs go to stderr so JSON output on
/// stdout stays machine-readable; `verbose` raises the crate to debug.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("qms_metrics=debug,qms_metrics_lib=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {}", e))
}
