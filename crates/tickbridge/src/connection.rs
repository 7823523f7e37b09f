//! Per-connection request handling.
//!
//! Each accepted socket carries exactly one request and receives exactly one
//! response line. Commands are acknowledged as soon as they are queued;
//! queries block this connection's thread until the host loop answers or the
//! query timeout elapses.

use std::io::Write;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;

use crate::correlation::{CorrelationTable, WaitHandle};
use crate::levels;
use crate::queue::PendingQueue;
use crate::reporter::BridgeReporter;
use crate::transport::{ConnectionHandler, read_request_line};
use crate::verbs::{DirectVerb, VerbCatalog, VerbKind, VerbSpec};
use crate::wire::{PendingItem, QueryId, Request, Response, ResponseWriter, WireError};

/// Settings a connection handler needs besides the shared structures.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// How long a query waits for the host loop.
    pub query_timeout: Duration,
    /// Linger between writing the response and closing the socket.
    pub close_delay: Duration,
    /// Directory listed by `getlevels`.
    pub saves_dir: Utf8PathBuf,
}

/// Serves one request per connection against the shared queue and table.
pub struct BridgeConnectionHandler {
    queue: Arc<PendingQueue>,
    table: Arc<CorrelationTable>,
    catalog: Arc<VerbCatalog>,
    settings: ConnectionSettings,
    reporter: Arc<dyn BridgeReporter>,
}

impl BridgeConnectionHandler {
    /// Creates a handler over the bridge's shared structures.
    pub fn new(
        queue: Arc<PendingQueue>,
        table: Arc<CorrelationTable>,
        catalog: Arc<VerbCatalog>,
        settings: ConnectionSettings,
        reporter: Arc<dyn BridgeReporter>,
    ) -> Self {
        Self {
            queue,
            table,
            catalog,
            settings,
            reporter,
        }
    }

    /// Produces the single response for a raw request line.
    ///
    /// Malformed requests are answered without touching the queue or the
    /// correlation table.
    pub fn respond(&self, raw: &[u8]) -> Response {
        let request = match Request::decode(raw) {
            Ok(request) => request,
            Err(error) => return Response::from(error),
        };
        let spec = match self.catalog.resolve(&request) {
            Ok(spec) => spec,
            Err(error) => return Response::from(error),
        };
        let payload = match spec.payload(&request) {
            Ok(payload) => payload,
            Err(error) => return Response::from(error),
        };

        match spec.kind() {
            VerbKind::Command => self.enqueue_command(spec, payload),
            VerbKind::Query => self.run_query(spec, payload),
            VerbKind::Direct(DirectVerb::Ping) => Response::pong(),
            VerbKind::Direct(DirectVerb::Levels) => self.list_levels(),
        }
    }

    fn enqueue_command(&self, spec: &VerbSpec, payload: String) -> Response {
        let item = PendingItem::command(spec.name(), payload);
        self.queue.enqueue(item.clone());
        self.reporter.item_queued(&item);
        Response::queued(spec.name())
    }

    fn run_query(&self, spec: &VerbSpec, payload: String) -> Response {
        let id = self.table.next_id();
        let handle = match self.table.register(id) {
            Ok(handle) => handle,
            Err(error) => return Response::Error(error.to_string()),
        };
        let item = PendingItem::query(id, spec.name(), payload);
        self.queue.enqueue(item.clone());
        self.reporter.item_queued(&item);

        match self.collect_result(id, &handle) {
            Some(result) => Response::Raw(result),
            None => {
                self.reporter.query_timed_out(id, spec.name());
                Response::from(WireError::QueryTimeout)
            }
        }
    }

    /// Waits for `id` and removes its registration whatever the outcome.
    ///
    /// A result published between the wait expiring and the removal is still
    /// returned.
    fn collect_result(&self, id: QueryId, handle: &WaitHandle) -> Option<String> {
        handle.wait(self.settings.query_timeout);
        self.table.take(id)
    }

    fn list_levels(&self) -> Response {
        match levels::list_levels(&self.settings.saves_dir) {
            Ok(json) => Response::Raw(json),
            Err(error) => Response::Error(error.to_string()),
        }
    }

    fn serve(&self, stream: &mut TcpStream) -> Result<(), WireError> {
        // Bounds a peer that connects but never finishes its line.
        stream.set_read_timeout(Some(self.settings.query_timeout))?;
        let response = match read_request_line(stream) {
            Ok(raw) => {
                let raw = raw.unwrap_or_default();
                self.reporter
                    .request_received(String::from_utf8_lossy(&raw).trim_end());
                self.respond(&raw)
            }
            Err(error @ WireError::RequestTooLarge { .. }) => Response::from(error),
            Err(error) => return Err(error),
        };

        ResponseWriter::new(&mut *stream).write_response(&response)?;
        self.reporter.response_sent(&response);
        stream.flush()?;
        thread::sleep(self.settings.close_delay);
        Ok(())
    }
}

impl ConnectionHandler for BridgeConnectionHandler {
    fn handle(&self, mut stream: TcpStream) {
        if let Err(error) = self.serve(&mut stream) {
            self.reporter.connection_failed(&error);
        }
        let _ = stream.shutdown(Shutdown::Both);
    }
}
