//! Error types for the client runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to resolve bridge address {endpoint}: {source}")]
    Resolve { endpoint: String, source: io::Error },
    #[error("failed to connect to bridge at {endpoint}: {source}")]
    Connect { endpoint: String, source: io::Error },
    #[error("failed to send request to bridge: {0}")]
    SendRequest(io::Error),
    #[error("failed to read response from bridge: {0}")]
    ReadResponse(io::Error),
    #[error("bridge closed the connection without a response")]
    EmptyResponse,
    #[error("failed to write response: {0}")]
    ForwardResponse(io::Error),
}

impl AppError {
    /// Returns true when the bridge is most likely not listening.
    pub(crate) fn is_bridge_down(&self) -> bool {
        match self {
            Self::Connect { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::ConnectionRefused | io::ErrorKind::AddrNotAvailable
            ),
            _ => false,
        }
    }
}
