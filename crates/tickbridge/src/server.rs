//! Start/stop lifecycle of the bridge listener.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::connection::BridgeConnectionHandler;
use crate::reporter::BridgeReporter;
use crate::transport::{ConnectionHandler, ListenerError, ListenerHandle, SocketListener};

const STOP_JOIN_BOUND: Duration = Duration::from_millis(1000);

/// Errors surfaced while starting or stopping the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or starting the listener failed.
    #[error("failed to start bridge listener on {host}:{port}: {source}")]
    Start {
        host: String,
        port: u16,
        #[source]
        source: ListenerError,
    },
    /// The accept thread panicked before it could be joined.
    #[error("failed to stop bridge listener: {source}")]
    Stop {
        #[source]
        source: ListenerError,
    },
    /// The accept thread was still running when the join bound elapsed, so
    /// the port may not be free yet.
    #[error("bridge listener on {addr} did not stop within {bound:?}")]
    StopTimedOut { addr: SocketAddr, bound: Duration },
}

/// Listener lifecycle wrapped around a shared connection handler.
///
/// At most one listener runs at a time. `start` on a running server reports
/// the fact and returns the bound address; `stop` on a stopped server does
/// nothing.
pub struct BridgeServer {
    handler: Arc<BridgeConnectionHandler>,
    reporter: Arc<dyn BridgeReporter>,
    listener: Mutex<Option<ListenerHandle>>,
}

impl BridgeServer {
    /// Creates a stopped server.
    pub fn new(handler: Arc<BridgeConnectionHandler>, reporter: Arc<dyn BridgeReporter>) -> Self {
        Self {
            handler,
            reporter,
            listener: Mutex::new(None),
        }
    }

    /// Binds `host:port` and starts accepting connections.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Start`] when the address cannot be resolved or
    /// bound.
    pub fn start(&self, host: &str, port: u16) -> Result<SocketAddr, ServerError> {
        let mut slot = self.listener.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = slot.as_ref() {
            let addr = running.local_addr();
            self.reporter.server_already_running(addr);
            return Ok(addr);
        }

        self.reporter.server_starting(host, port);
        let handler: Arc<dyn ConnectionHandler> = self.handler.clone();
        let started = SocketListener::bind(host, port).and_then(|listener| listener.start(handler));
        match started {
            Ok(handle) => {
                let addr = handle.local_addr();
                *slot = Some(handle);
                self.reporter.server_started(addr);
                Ok(addr)
            }
            Err(source) => {
                let error = ServerError::Start {
                    host: host.to_owned(),
                    port,
                    source,
                };
                self.reporter.server_start_failed(&error);
                Err(error)
            }
        }
    }

    /// Stops accepting connections and waits, up to one second, for the
    /// port to be released.
    ///
    /// In-flight connections are not interrupted; they finish on their own
    /// threads.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Stop`] when the accept thread panicked and
    /// [`ServerError::StopTimedOut`] when it outlived the bound.
    pub fn stop(&self) -> Result<(), ServerError> {
        self.stop_within(STOP_JOIN_BOUND)
    }

    /// Stops the listener, waiting at most `bound` for the accept thread.
    ///
    /// The listener is detached either way; `server_stopped` is only
    /// reported once the thread has exited.
    ///
    /// # Errors
    ///
    /// See [`BridgeServer::stop`].
    pub fn stop_within(&self, bound: Duration) -> Result<(), ServerError> {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(handle) = handle else {
            return Ok(());
        };
        let addr = handle.local_addr();
        handle.shutdown();
        let joined = handle
            .join_within(bound)
            .map_err(|source| ServerError::Stop { source })?;
        if !joined {
            return Err(ServerError::StopTimedOut { addr, bound });
        }
        self.reporter.server_stopped();
        Ok(())
    }

    /// Returns true while the listener is running.
    pub fn is_running(&self) -> bool {
        self.local_addr().is_some()
    }

    /// Address of the running listener.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(ListenerHandle::local_addr)
    }
}

impl Drop for BridgeServer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
