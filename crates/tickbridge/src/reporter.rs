//! Structured reporting for bridge lifecycle and traffic events.

use std::net::SocketAddr;
use std::sync::Arc;

use tickbridge_config::Config;

use crate::bootstrap::BootstrapError;
use crate::registry::HandlerError;
use crate::server::ServerError;
use crate::wire::{PendingItem, QueryId, Response, WireError};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");
const BRIDGE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bridge");
const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Observer trait used to surface bridge events to telemetry sinks.
pub trait BridgeReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked before the listener binds.
    fn server_starting(&self, host: &str, port: u16);

    /// Invoked once the listener accepts connections.
    fn server_started(&self, addr: SocketAddr);

    /// Invoked when binding or starting the listener fails.
    fn server_start_failed(&self, error: &ServerError);

    /// Invoked when `start` is called on a running server.
    fn server_already_running(&self, addr: SocketAddr);

    /// Invoked after the listener has released its port.
    fn server_stopped(&self);

    /// Invoked when a connection delivers a request line.
    fn request_received(&self, request: &str);

    /// Invoked after an item has been appended to the pending queue.
    fn item_queued(&self, item: &PendingItem);

    /// Invoked after a response line has been written.
    fn response_sent(&self, response: &Response);

    /// Invoked when a query waiter gives up.
    fn query_timed_out(&self, id: QueryId, verb: &str);

    /// Invoked when a connection fails at the socket level.
    fn connection_failed(&self, error: &WireError);

    /// Invoked when a command handler fails on the host thread.
    fn command_failed(&self, verb: &str, error: &HandlerError);

    /// Invoked when the host has no handler for a queued command.
    fn verb_dropped(&self, item: &PendingItem);
}

impl<T> BridgeReporter for Arc<T>
where
    T: BridgeReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn server_starting(&self, host: &str, port: u16) {
        (**self).server_starting(host, port);
    }

    fn server_started(&self, addr: SocketAddr) {
        (**self).server_started(addr);
    }

    fn server_start_failed(&self, error: &ServerError) {
        (**self).server_start_failed(error);
    }

    fn server_already_running(&self, addr: SocketAddr) {
        (**self).server_already_running(addr);
    }

    fn server_stopped(&self) {
        (**self).server_stopped();
    }

    fn request_received(&self, request: &str) {
        (**self).request_received(request);
    }

    fn item_queued(&self, item: &PendingItem) {
        (**self).item_queued(item);
    }

    fn response_sent(&self, response: &Response) {
        (**self).response_sent(response);
    }

    fn query_timed_out(&self, id: QueryId, verb: &str) {
        (**self).query_timed_out(id, verb);
    }

    fn connection_failed(&self, error: &WireError) {
        (**self).connection_failed(error);
    }

    fn command_failed(&self, verb: &str, error: &HandlerError) {
        (**self).command_failed(verb, error);
    }

    fn verb_dropped(&self, item: &PendingItem) {
        (**self).verb_dropped(item);
    }
}

/// Default reporter that records events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredReporter;

impl StructuredReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BridgeReporter for StructuredReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            host = %config.host(),
            port = config.port(),
            auto_start = config.auto_start(),
            log_filter = %config.log_filter(),
            log_format = ?config.log_format(),
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn server_starting(&self, host: &str, port: u16) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_starting",
            host,
            port,
            "starting bridge server"
        );
    }

    fn server_started(&self, addr: SocketAddr) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_started",
            addr = %addr,
            "bridge server listening"
        );
    }

    fn server_start_failed(&self, error: &ServerError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "server_start_failed",
            error = %error,
            "bridge server failed to start"
        );
    }

    fn server_already_running(&self, addr: SocketAddr) {
        tracing::warn!(
            target: HEALTH_TARGET,
            event = "server_already_running",
            addr = %addr,
            "bridge server is already running"
        );
    }

    fn server_stopped(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            "bridge server stopped"
        );
    }

    fn request_received(&self, request: &str) {
        tracing::debug!(
            target: BRIDGE_TARGET,
            event = "request_received",
            request,
            "received request"
        );
    }

    fn item_queued(&self, item: &PendingItem) {
        tracing::info!(
            target: BRIDGE_TARGET,
            event = "item_queued",
            item = %item,
            "queued item for host loop"
        );
    }

    fn response_sent(&self, response: &Response) {
        tracing::debug!(
            target: BRIDGE_TARGET,
            event = "response_sent",
            response = %response,
            error = response.is_error(),
            "sent response"
        );
    }

    fn query_timed_out(&self, id: QueryId, verb: &str) {
        tracing::warn!(
            target: BRIDGE_TARGET,
            event = "query_timed_out",
            query_id = id.get(),
            verb,
            "query was not answered in time"
        );
    }

    fn connection_failed(&self, error: &WireError) {
        tracing::warn!(
            target: BRIDGE_TARGET,
            event = "connection_failed",
            error = %error,
            "connection handler error"
        );
    }

    fn command_failed(&self, verb: &str, error: &HandlerError) {
        tracing::error!(
            target: DISPATCH_TARGET,
            event = "command_failed",
            verb,
            error = %error,
            "command handler failed"
        );
    }

    fn verb_dropped(&self, item: &PendingItem) {
        tracing::warn!(
            target: DISPATCH_TARGET,
            event = "verb_dropped",
            verb = item.verb(),
            "no host handler for queued command"
        );
    }
}
