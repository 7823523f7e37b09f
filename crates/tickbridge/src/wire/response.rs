//! Response rendering for the line protocol.
//!
//! Every connection receives exactly one response: `OK: <message>`,
//! `ERROR: <message>`, or the raw text a query handler produced.

use std::fmt;
use std::io::Write;

use super::errors::WireError;

/// Single response written back to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Acknowledgement, rendered as `OK: <message>`.
    Ok(String),
    /// Failure, rendered as `ERROR: <message>`.
    Error(String),
    /// Query result or direct answer, rendered verbatim.
    Raw(String),
}

impl Response {
    /// Acknowledges a command accepted into the queue.
    pub fn queued(verb: &str) -> Self {
        Self::Ok(format!("Queued {verb}"))
    }

    /// Builds an error response from a wire error.
    pub fn from_error(error: &WireError) -> Self {
        Self::Error(error.to_string())
    }

    /// Answer to `ping`.
    pub fn pong() -> Self {
        Self::Raw("PONG".to_owned())
    }

    /// Returns true for `ERROR:` responses and raw text that already carries
    /// the error prefix.
    pub fn is_error(&self) -> bool {
        match self {
            Self::Error(_) => true,
            Self::Raw(text) => text.starts_with("ERROR:"),
            Self::Ok(_) => false,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok(message) => write!(formatter, "OK: {message}"),
            Self::Error(message) => write!(formatter, "ERROR: {message}"),
            Self::Raw(text) => formatter.write_str(text),
        }
    }
}

impl From<WireError> for Response {
    fn from(error: WireError) -> Self {
        Self::from_error(&error)
    }
}

/// Writes newline-terminated responses to a stream.
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Creates a new response writer wrapping the given output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes a response followed by `\n` and flushes.
    ///
    /// Raw query text is written verbatim, so a multi-line result such as
    /// `getoutput` spans several lines with a single terminating `\n`.
    /// Clients must read until the server closes the connection rather than
    /// stopping at the first newline.
    ///
    /// # Errors
    ///
    /// Returns an error if writing or flushing fails.
    pub fn write_response(&mut self, response: &Response) -> Result<(), WireError> {
        writeln!(self.writer, "{response}")?;
        self.writer.flush()?;
        Ok(())
    }
}
