//! Error types for request decoding and routing failures.
//!
//! Every variant renders as the text that follows `ERROR: ` on the wire, so
//! the display strings double as client-visible messages.

use std::io;

use thiserror::Error;

/// Errors surfaced while decoding, validating, or answering a request.
#[derive(Debug, Error)]
pub enum WireError {
    /// The request line was empty once line terminators were stripped.
    #[error("Empty request")]
    EmptyRequest,

    /// The verb is not present in the catalogue.
    #[error("Unknown command '{verb}'")]
    UnknownVerb { verb: String },

    /// The verb needs arguments the request did not supply.
    #[error("{usage}")]
    MissingArguments { verb: String, usage: String },

    /// The request exceeded the per-connection read bound.
    #[error("request too large: {size} bytes exceeds {max_size} byte limit")]
    RequestTooLarge { size: usize, max_size: usize },

    /// An internal queued line did not match either queued form.
    #[error("malformed queued item: {message}")]
    MalformedItem { message: String },

    /// The host loop did not answer a query in time.
    #[error("Query timeout")]
    QueryTimeout,

    /// IO error while reading the request or writing the response.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl WireError {
    /// Creates an unknown verb error.
    pub fn unknown_verb(verb: impl Into<String>) -> Self {
        Self::UnknownVerb { verb: verb.into() }
    }

    /// Creates a missing arguments error carrying the verb's usage message.
    pub fn missing_arguments(verb: impl Into<String>, usage: impl Into<String>) -> Self {
        Self::MissingArguments {
            verb: verb.into(),
            usage: usage.into(),
        }
    }

    /// Creates a request too large error.
    pub fn request_too_large(size: usize, max_size: usize) -> Self {
        Self::RequestTooLarge { size, max_size }
    }

    /// Creates a malformed queued item error.
    pub fn malformed_item(message: impl Into<String>) -> Self {
        Self::MalformedItem {
            message: message.into(),
        }
    }
}
