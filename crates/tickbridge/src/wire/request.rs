//! Request decoding for the line protocol.
//!
//! A request is one line of UTF-8 text: a case-insensitive verb followed by
//! optional space-separated arguments. The line splits on the first two
//! spaces only, so the last field keeps any embedded spaces (source code for
//! `setcode`, coordinates for `camera`).

use super::errors::WireError;

/// Parsed client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    verb: String,
    first: Option<String>,
    rest: Option<String>,
}

impl Request {
    /// Decodes raw bytes read from a connection.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns `WireError::EmptyRequest` when nothing remains after the
    /// trailing line terminators are stripped.
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Parses a request line.
    ///
    /// Only trailing `\r` and `\n` are stripped; other whitespace is
    /// significant.
    ///
    /// # Errors
    ///
    /// Returns `WireError::EmptyRequest` for an empty line.
    pub fn parse(line: &str) -> Result<Self, WireError> {
        let trimmed = strip_line_terminators(line);
        if trimmed.is_empty() {
            return Err(WireError::EmptyRequest);
        }

        let mut parts = trimmed.splitn(3, ' ');
        let verb = parts.next().unwrap_or_default().to_lowercase();
        let first = parts.next().filter(|part| !part.is_empty()).map(str::to_owned);
        let rest = parts.next().filter(|part| !part.is_empty()).map(str::to_owned);
        Ok(Self { verb, first, rest })
    }

    /// Lower-cased verb.
    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// First argument, if present.
    pub fn first(&self) -> Option<&str> {
        self.first.as_deref()
    }

    /// Everything after the first argument, if present.
    pub fn rest(&self) -> Option<&str> {
        self.rest.as_deref()
    }

    /// Everything after the verb, re-joined with a single space.
    pub fn remainder(&self) -> Option<String> {
        match (self.first(), self.rest()) {
            (Some(first), Some(rest)) => Some(format!("{first} {rest}")),
            (Some(only), None) | (None, Some(only)) => Some(only.to_owned()),
            (None, None) => None,
        }
    }
}

fn strip_line_terminators(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}
