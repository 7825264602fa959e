//! Subscriber setup for construction events
//!
//! The crate reports through `tracing` under the [`TARGET`] target. Class
//! and service registration, construction start and failure are `debug`
//! events. Argument assembly, service injection and each setter call are
//! `trace` events.
//!
//! Nothing is printed until a subscriber is installed. With the
//! `logging-json` or `logging-pretty` feature, [`builder`] installs one:
//!
//! ```rust,ignore
//! use object_factory::logging;
//!
//! // Every step of every construction, unless RUST_LOG says otherwise
//! logging::builder().trace().with_env_filter().init();
//! ```

use tracing::Level;

/// Target of every event emitted by this crate
pub const TARGET: &str = "object_factory";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event; needs `logging-json`
    Json,
    /// Multi-line human readable output
    Pretty,
}

impl Default for LogFormat {
    fn default() -> Self {
        if cfg!(feature = "logging-json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

/// Subscriber settings. By default only construction events at `debug` are
/// shown.
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    all_targets: bool,
    from_env: bool,
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::default(),
            all_targets: false,
            from_env: false,
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Show argument assembly and setter calls too
    pub fn trace(self) -> Self {
        self.level(Level::TRACE)
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Also show events from other crates, such as constructors that log
    pub fn all_targets(mut self) -> Self {
        self.all_targets = true;
        self
    }

    /// Let a set `RUST_LOG` replace the level and target settings
    pub fn with_env_filter(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Filter directive built from the level and target settings
    pub fn directive(&self) -> String {
        if self.all_targets {
            self.level.to_string()
        } else {
            format!("{TARGET}={}", self.level)
        }
    }

    /// Install the subscriber globally.
    ///
    /// Returns `false` when another subscriber was installed first.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) -> bool {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let directive = self.directive();
        let filter = if self.from_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive))
        } else {
            EnvFilter::new(&directive)
        };
        let registry = tracing_subscriber::registry().with(filter);

        let installed = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => registry.with(fmt::layer().compact()).try_init(),
            LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
        };
        installed.is_ok()
    }

    /// Without a subscriber feature there is nothing to install
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) -> bool {
        false
    }
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install the default subscriber, honoring `RUST_LOG`
pub fn init() -> bool {
    builder().with_env_filter().init()
}
