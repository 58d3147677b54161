//! Tracing subscriber setup for hosts that want a ready-made logger.
//!
//! Libraries embedding the controller usually install their own
//! subscriber; [`init_logging`] is for binaries and examples that just
//! want sensible output. The `RUST_LOG` environment variable always takes
//! precedence over the configured level.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{Result, TagError};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output for development.
    Pretty,
    /// One JSON object per line for log collectors.
    Json,
    /// Single-line text output.
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

/// Configuration for [`init_logging`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Maximum level for this workspace's crates.
    pub level: Level,
    /// Full filter directive string; overrides `level` when set.
    pub filter: Option<String>,
    pub display_target: bool,
}

impl LoggingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_target(mut self, display_target: bool) -> Self {
        self.display_target = display_target;
        self
    }

    /// Filter directives: this workspace at the configured level, noisy
    /// HTTP dependencies capped at warn.
    fn build_filter(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => {
                let level = self.level.to_string().to_lowercase();
                format!(
                    "audiotag_core={level},audiotag_desktop={level},audiotag_traits={level},\
                     h2=warn,hyper=warn,reqwest=warn"
                )
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            filter: None,
            display_target: false,
        }
    }
}

/// Install a global tracing subscriber.
///
/// Fails when a subscriber is already set, which callers embedding the
/// controller into a larger application can usually ignore.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.build_filter()))
        .map_err(|err| TagError::Config(format!("invalid log filter: {err}")))?;

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(config.display_target),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.display_target),
            )
            .try_init(),
    };

    result.map_err(|err| TagError::Config(format!("failed to set subscriber: {err}")))
}
