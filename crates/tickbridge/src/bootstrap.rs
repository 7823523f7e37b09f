//! Bridge bootstrap orchestration.

use std::net::SocketAddr;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use tickbridge_config::{Config, OrthoConfig};

use crate::connection::{BridgeConnectionHandler, ConnectionSettings};
use crate::correlation::CorrelationTable;
use crate::dispatcher::HostDispatcher;
use crate::queue::PendingQueue;
use crate::registry::HandlerRegistry;
use crate::reporter::BridgeReporter;
use crate::server::{BridgeServer, ServerError};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};
use crate::verbs::VerbCatalog;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the bridge configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader that returns a pre-resolved configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps an already resolved configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The listener could not be started.
    #[error("failed to start bridge server: {source}")]
    Server {
        /// Underlying server error.
        #[source]
        source: ServerError,
    },
}

/// A bootstrapped bridge: shared structures plus the server around them.
pub struct Bridge {
    config: Config,
    queue: Arc<PendingQueue>,
    table: Arc<CorrelationTable>,
    server: BridgeServer,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn BridgeReporter>,
}

impl Bridge {
    /// Builds a stopped bridge serving `catalog`.
    pub fn new(
        config: Config,
        catalog: VerbCatalog,
        telemetry: TelemetryHandle,
        reporter: Arc<dyn BridgeReporter>,
    ) -> Self {
        let queue = Arc::new(PendingQueue::new());
        let table = Arc::new(CorrelationTable::new());
        let handler = Arc::new(BridgeConnectionHandler::new(
            Arc::clone(&queue),
            Arc::clone(&table),
            Arc::new(catalog),
            ConnectionSettings {
                query_timeout: config.query_timeout(),
                close_delay: config.close_delay(),
                saves_dir: config.saves_dir(),
            },
            Arc::clone(&reporter),
        ));
        let server = BridgeServer::new(handler, Arc::clone(&reporter));
        Self {
            config,
            queue,
            table,
            server,
            telemetry,
            reporter,
        }
    }

    /// Builds the host-side dispatcher sharing this bridge's queue and table.
    pub fn dispatcher<H>(&self, registry: HandlerRegistry<H>) -> HostDispatcher<H> {
        HostDispatcher::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.table),
            registry,
            Arc::clone(&self.reporter),
        )
    }

    /// Starts the listener on the configured address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Start`] when the address cannot be bound.
    pub fn start(&self) -> Result<SocketAddr, ServerError> {
        self.server.start(self.config.host(), self.config.port())
    }

    /// Stops the listener.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Stop`] when the accept thread panicked and
    /// [`ServerError::StopTimedOut`] when it did not exit in time.
    pub fn stop(&self) -> Result<(), ServerError> {
        self.server.stop()
    }

    /// Listener lifecycle.
    pub fn server(&self) -> &BridgeServer {
        &self.server
    }

    /// Shared pending queue.
    pub fn queue(&self) -> &Arc<PendingQueue> {
        &self.queue
    }

    /// Shared correlation table.
    pub fn table(&self) -> &Arc<CorrelationTable> {
        &self.table
    }

    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }
}

/// Bootstraps the bridge using the supplied collaborators.
///
/// The server is started when the configuration enables `auto_start`.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn BridgeReporter>,
    catalog: VerbCatalog,
) -> Result<Bridge, BootstrapError> {
    reporter.bootstrap_starting();

    let config = match loader.load() {
        Ok(config) => config,
        Err(source) => {
            let error = BootstrapError::Configuration { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let telemetry = match telemetry::initialise(&config) {
        Ok(handle) => handle,
        Err(source) => {
            let error = BootstrapError::Telemetry { source };
            reporter.bootstrap_failed(&error);
            return Err(error);
        }
    };

    let bridge = Bridge::new(config, catalog, telemetry, Arc::clone(&reporter));
    if bridge.config().auto_start()
        && let Err(source) = bridge.start()
    {
        let error = BootstrapError::Server { source };
        reporter.bootstrap_failed(&error);
        return Err(error);
    }

    reporter.bootstrap_succeeded(bridge.config());
    Ok(bridge)
}
