//! Shared test doubles: a recording reporter and configuration loaders.

use std::ffi::OsString;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use camino::Utf8PathBuf;
use ortho_config::OrthoError;
use tempfile::TempDir;
use tickbridge_config::{Config, OrthoConfig};

use crate::bootstrap::{BootstrapError, ConfigLoader};
use crate::registry::HandlerError;
use crate::reporter::BridgeReporter;
use crate::server::ServerError;
use crate::wire::{PendingItem, QueryId, Response, WireError};

/// Bridge events tracked during scenarios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BridgeEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ServerStarting { host: String, port: u16 },
    ServerStarted(SocketAddr),
    ServerStartFailed(String),
    ServerAlreadyRunning(SocketAddr),
    ServerStopped,
    RequestReceived(String),
    ItemQueued(String),
    ResponseSent(String),
    QueryTimedOut { id: QueryId, verb: String },
    ConnectionFailed(String),
    CommandFailed { verb: String, message: String },
    VerbDropped(String),
}

/// Records bridge events for assertions.
#[derive(Debug, Default)]
pub(crate) struct RecordingReporter {
    events: Mutex<Vec<BridgeEvent>>,
}

impl RecordingReporter {
    /// Captures a copy of the recorded events.
    pub(crate) fn events(&self) -> Vec<BridgeEvent> {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: BridgeEvent) {
        self.events
            .lock()
            .expect("reporter mutex poisoned")
            .push(event);
    }
}

impl BridgeReporter for RecordingReporter {
    fn bootstrap_starting(&self) {
        self.record(BridgeEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(BridgeEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(BridgeEvent::BootstrapFailed(error.to_string()));
    }

    fn server_starting(&self, host: &str, port: u16) {
        self.record(BridgeEvent::ServerStarting {
            host: host.to_owned(),
            port,
        });
    }

    fn server_started(&self, addr: SocketAddr) {
        self.record(BridgeEvent::ServerStarted(addr));
    }

    fn server_start_failed(&self, error: &ServerError) {
        self.record(BridgeEvent::ServerStartFailed(error.to_string()));
    }

    fn server_already_running(&self, addr: SocketAddr) {
        self.record(BridgeEvent::ServerAlreadyRunning(addr));
    }

    fn server_stopped(&self) {
        self.record(BridgeEvent::ServerStopped);
    }

    fn request_received(&self, request: &str) {
        self.record(BridgeEvent::RequestReceived(request.to_owned()));
    }

    fn item_queued(&self, item: &PendingItem) {
        self.record(BridgeEvent::ItemQueued(item.to_string()));
    }

    fn response_sent(&self, response: &Response) {
        self.record(BridgeEvent::ResponseSent(response.to_string()));
    }

    fn query_timed_out(&self, id: QueryId, verb: &str) {
        self.record(BridgeEvent::QueryTimedOut {
            id,
            verb: verb.to_owned(),
        });
    }

    fn connection_failed(&self, error: &WireError) {
        self.record(BridgeEvent::ConnectionFailed(error.to_string()));
    }

    fn command_failed(&self, verb: &str, error: &HandlerError) {
        self.record(BridgeEvent::CommandFailed {
            verb: verb.to_owned(),
            message: error.message().to_owned(),
        });
    }

    fn verb_dropped(&self, item: &PendingItem) {
        self.record(BridgeEvent::VerbDropped(item.verb().to_owned()));
    }
}

/// Loader yielding a loopback configuration on an ephemeral port with a
/// temporary saves directory.
pub(crate) struct TestConfigLoader {
    saves: TempDir,
    auto_start: bool,
    query_timeout_ms: u64,
}

impl TestConfigLoader {
    pub(crate) fn new() -> Self {
        Self {
            saves: TempDir::new().expect("failed to create temporary saves directory"),
            auto_start: true,
            query_timeout_ms: 2_000,
        }
    }

    pub(crate) fn without_auto_start(mut self) -> Self {
        self.auto_start = false;
        self
    }

    pub(crate) fn with_query_timeout_ms(mut self, timeout: u64) -> Self {
        self.query_timeout_ms = timeout;
        self
    }

    pub(crate) fn config(&self) -> Config {
        Config {
            host: "127.0.0.1".to_owned(),
            port: 0,
            auto_start: Some(self.auto_start),
            query_timeout_ms: self.query_timeout_ms,
            close_delay_ms: 0,
            saves_dir: Some(
                Utf8PathBuf::from_path_buf(self.saves.path().to_path_buf())
                    .expect("temporary saves path was not valid UTF-8"),
            ),
            ..Config::default()
        }
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config())
    }
}

/// Loader that resolves the configuration through the layered loader with
/// only the bind address supplied on the command line.
pub(crate) struct LayeredConfigLoader;

impl ConfigLoader for LayeredConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load_from_iter([
            OsString::from("tickbridged"),
            OsString::from("--host"),
            OsString::from("127.0.0.1"),
            OsString::from("--port"),
            OsString::from("0"),
        ])
    }
}

/// Loader that intentionally fails by passing an invalid port.
pub(crate) struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("tickbridged"),
            OsString::from("--port"),
            OsString::from("not-a-port"),
        ];
        Config::load_from_iter(args)
    }
}
