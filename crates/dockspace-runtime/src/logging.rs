//! Tracing subscriber setup for hosts that have none of their own.
//!
//! Filtering follows the `DOCKSPACE_LOG` environment variable:
//! - `DOCKSPACE_LOG=debug` - everything at debug
//! - `DOCKSPACE_LOG=dockspace.restore=trace,dockspace.codec=debug` - per area
//!
//! Without it only `info` and above are shown.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "DOCKSPACE_LOG";

/// Output format for [`init_tracing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per line; needs the `json-logs` feature and falls
    /// back to text without it.
    Json,
}

/// Filter from [`LOG_ENV`], or `default_directive` when unset or invalid.
#[must_use]
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install a global fmt subscriber.
///
/// Returns false when a global subscriber was already set; the existing one
/// is kept.
pub fn init_tracing(format: LogFormat) -> bool {
    let filter = env_filter("info");
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        #[cfg(feature = "json-logs")]
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    };
    installed.is_ok()
}
