// Logging setup shared by both binaries

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log lines go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    /// Keeps stdout free for plugin output
    Stderr,
}

/// Install the global subscriber. `RUST_LOG` overrides `level` when set.
pub fn setup_logging(level: Level, target: LogTarget) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let builder = FmtSubscriber::builder().with_env_filter(filter);
    let installed = match target {
        LogTarget::Stdout => tracing::subscriber::set_global_default(builder.finish()),
        LogTarget::Stderr => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stderr).with_ansi(false).finish(),
        ),
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}
