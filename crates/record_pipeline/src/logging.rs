//! Tracing subscriber setup for the binary.
//!
//! Diagnostics go to stderr so that stdout carries only the run report.
//! The filter defaults to `info` and can be overridden through `RUST_LOG`.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Terminal,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Builds the formatting layer for this format, filtered by `filter`.
    pub fn layer(self, filter: EnvFilter) -> Box<dyn Layer<Registry> + Send + Sync + 'static> {
        match self {
            Self::Terminal => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .with_filter(filter)
                .boxed(),
            Self::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .with_filter(filter)
                .boxed(),
        }
    }
}

/// Parses `directives` on top of an `info` default.
fn filter_from(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .parse_lossy(directives)
}

/// Installs the global subscriber.
pub fn init(format: LogFormat) {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_default();
    let filter = filter_from(&directives);

    // The error is returned if a global subscriber is already set,
    // so it's safe to ignore it
    let _ = tracing_subscriber::registry()
        .with(format.layer(filter))
        .try_init();
}
