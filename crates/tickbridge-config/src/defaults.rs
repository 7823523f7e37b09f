use camino::Utf8PathBuf;
use std::env;

use dirs::data_dir;

/// Default interface the bridge listens on.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default TCP port for the bridge listener.
pub const DEFAULT_PORT: u16 = 9999;

/// Default time a query waits for the host loop before giving up.
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5_000;

/// Default linger between writing a response and closing the socket.
pub const DEFAULT_CLOSE_DELAY_MS: u64 = 50;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default listening interface.
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default listening port.
pub const fn default_port() -> u16 {
    DEFAULT_PORT
}

/// The bridge starts with the host unless told otherwise.
pub const fn default_auto_start() -> bool {
    true
}

/// Default query timeout in milliseconds.
pub const fn default_query_timeout_ms() -> u64 {
    DEFAULT_QUERY_TIMEOUT_MS
}

/// Default close delay in milliseconds.
pub const fn default_close_delay_ms() -> u64 {
    DEFAULT_CLOSE_DELAY_MS
}

/// Default log filter expression used by the binaries.
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Json
}

/// Directory scanned by `getlevels` when no override is configured.
///
/// Resolves to `<data dir>/tickbridge/Saves`, falling back to the system
/// temporary directory when the platform reports no data directory.
pub fn default_saves_dir() -> Utf8PathBuf {
    let mut base = data_dir()
        .and_then(|path| Utf8PathBuf::from_path_buf(path).ok())
        .unwrap_or_else(fallback_base_directory);
    base.push("tickbridge");
    base.push("Saves");
    base
}

fn fallback_base_directory() -> Utf8PathBuf {
    let candidate = env::temp_dir();
    Utf8PathBuf::from_path_buf(candidate).unwrap_or_else(|_| Utf8PathBuf::from("/tmp"))
}
