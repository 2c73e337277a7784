//! Logging setup shared by the binaries

use std::io;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Logging behavior for one process
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: Level,
    /// Whether log lines carry timestamps
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Errors only, no timestamps, for callers whose stdout is parsed
    pub fn silent() -> Self {
        Self {
            level: Level::ERROR,
            timestamps: false,
        }
    }
}

/// Install the global subscriber; later calls are no-ops.
///
/// `RUST_LOG` overrides the configured default level. Everything goes to
/// stderr so stdout stays reserved for results.
pub fn setup_logging(config: LogConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_target(false);
        if config.timestamps {
            let _ = builder.try_init();
        } else {
            let _ = builder.without_time().try_init();
        }
    });
}
