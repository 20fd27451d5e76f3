//! Log subscriber setup for the command-line tool.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Variable holding an `EnvFilter` directive, e.g. `fakebin=debug`.
pub const LOG_ENV: &str = "FAKEBIN_LOG";

/// Install a stderr subscriber.
///
/// `FAKEBIN_LOG` wins when set; otherwise the level is `info` when verbose
/// and `warn` when not.
pub fn init(verbose: bool) -> Result<()> {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("install log subscriber: {err}"))
}
