//! Shared configuration for the tickbridge daemon and client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then a TOML file
//! (`--config-path` or `TICKBRIDGE_CONFIG_PATH`), then `TICKBRIDGE_*`
//! environment variables, then command-line flags.

mod defaults;
mod logging;

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_CLOSE_DELAY_MS, DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT,
    DEFAULT_QUERY_TIMEOUT_MS, default_auto_start, default_close_delay_ms, default_host,
    default_log_filter, default_log_filter_string, default_log_format, default_port,
    default_query_timeout_ms, default_saves_dir,
};
pub use logging::{LogFormat, LogFormatParseError};
/// Brought into scope by callers that need `Config::load` and
/// `Config::load_from_iter`.
pub use ortho_config::{OrthoConfig, OrthoError};

/// Resolved bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(
    prefix = "TICKBRIDGE",
    discovery(
        app_name = "tickbridge",
        env_var = "TICKBRIDGE_CONFIG_PATH",
        config_file_name = "tickbridge.toml",
        config_cli_long = "config-path",
        config_cli_visible = true,
    )
)]
pub struct Config {
    /// Interface the listener binds to.
    #[serde(default = "defaults::default_host")]
    pub host: String,
    /// TCP port the listener binds to.
    #[serde(default = "defaults::default_port")]
    pub port: u16,
    /// Starts the listener as soon as the host boots. Unset resolves to
    /// [`default_auto_start`], so an absent CLI flag leaves lower layers intact.
    #[serde(default)]
    pub auto_start: Option<bool>,
    /// Milliseconds a query waits for the host loop.
    #[serde(default = "defaults::default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Milliseconds to linger after writing a response before closing.
    #[serde(default = "defaults::default_close_delay_ms")]
    pub close_delay_ms: u64,
    /// Directory scanned by `getlevels`.
    #[serde(default)]
    pub saves_dir: Option<Utf8PathBuf>,
    /// `tracing` filter expression.
    #[serde(default = "defaults::default_log_filter_string")]
    pub log_filter: String,
    /// Log output format.
    #[serde(default = "defaults::default_log_format")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            auto_start: None,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            close_delay_ms: DEFAULT_CLOSE_DELAY_MS,
            saves_dir: None,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Interface the listener binds to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port the listener binds to.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Whether the listener starts together with the host.
    #[must_use]
    pub fn auto_start(&self) -> bool {
        self.auto_start.unwrap_or_else(default_auto_start)
    }

    /// How long a query waits for the host loop.
    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Linger between the response write and the socket close.
    #[must_use]
    pub const fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }

    /// Directory listed by `getlevels`.
    #[must_use]
    pub fn saves_dir(&self) -> Utf8PathBuf {
        self.saves_dir
            .as_deref()
            .map_or_else(default_saves_dir, Utf8Path::to_path_buf)
    }

    /// `tracing` filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
