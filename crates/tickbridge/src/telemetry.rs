//! Structured logging for the bridge.
//!
//! A single global subscriber is layered from an [`EnvFilter`] and a `fmt`
//! layer writing to stderr, in JSON or compact form. The first call to
//! [`initialise`] installs it; the format chosen then stays in force for the
//! life of the process.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::{self, time::UtcTime};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

use tickbridge_config::{Config, LogFormat};

static INSTALLED_FORMAT: OnceCell<LogFormat> = OnceCell::new();

/// Proof that the global subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryHandle {
    format: LogFormat,
}

impl TelemetryHandle {
    /// Format of the installed subscriber, which may differ from the
    /// configuration passed to a later [`initialise`] call.
    #[must_use]
    pub const fn format(self) -> LogFormat {
        self.format
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The configured filter expression did not parse.
    #[error("invalid log filter '{expression}': {message}")]
    Filter { expression: String, message: String },
    /// Another subscriber already owns the global default.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] TryInitError),
}

/// Installs the global subscriber on first use.
///
/// # Errors
///
/// Fails when the filter does not parse or when a subscriber installed
/// outside this module already holds the global default.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED_FORMAT
        .get_or_try_init(|| install_subscriber(config).map(|()| config.log_format()))
        .map(|format| TelemetryHandle { format: *format })
}

fn parse_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter {
        expression: expression.to_owned(),
        message: error.to_string(),
    })
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let registry = tracing_subscriber::registry().with(parse_filter(config.log_filter())?);
    let installed = match config.log_format() {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_thread_names(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(io::stderr),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_thread_names(true)
                    .with_ansi(io::stderr().is_terminal())
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(io::stderr),
            )
            .try_init(),
    };
    installed.map_err(TelemetryError::from)
}
