//! Items handed from connection threads to the host loop.
//!
//! Items travel through the queue as typed values. Their textual queued form
//! (`<verb>|<payload>` for commands, `QUERY|<id>|<verb>|<payload>` for
//! queries) is what gets logged and what [`PendingItem::from_str`] accepts.

use std::fmt;
use std::str::FromStr;

use super::errors::WireError;

const QUERY_TAG: &str = "QUERY";

/// Identifier correlating a queued query with its waiting connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(u64);

impl QueryId {
    /// Wraps a raw counter value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw counter value.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

impl FromStr for QueryId {
    type Err = WireError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        input
            .parse::<u64>()
            .map(Self)
            .map_err(|error| WireError::malformed_item(format!("query id '{input}': {error}")))
    }
}

/// Unit of work waiting for the host loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingItem {
    /// Fire-and-forget mutation; the client was acknowledged on enqueue.
    Command { verb: String, payload: String },
    /// Synchronous read whose result is published through the correlation
    /// table.
    Query {
        id: QueryId,
        verb: String,
        payload: String,
    },
}

impl PendingItem {
    /// Builds a command item.
    pub fn command(verb: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Command {
            verb: verb.into(),
            payload: payload.into(),
        }
    }

    /// Builds a query item.
    pub fn query(id: QueryId, verb: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Query {
            id,
            verb: verb.into(),
            payload: payload.into(),
        }
    }

    /// Verb the host handler is looked up by.
    pub fn verb(&self) -> &str {
        match self {
            Self::Command { verb, .. } | Self::Query { verb, .. } => verb,
        }
    }

    /// Payload passed to the host handler.
    pub fn payload(&self) -> &str {
        match self {
            Self::Command { payload, .. } | Self::Query { payload, .. } => payload,
        }
    }

    /// Query identifier, for query items.
    pub fn query_id(&self) -> Option<QueryId> {
        match self {
            Self::Command { .. } => None,
            Self::Query { id, .. } => Some(*id),
        }
    }
}

impl fmt::Display for PendingItem {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command { verb, payload } => write!(formatter, "{verb}|{payload}"),
            Self::Query { id, verb, payload } => {
                write!(formatter, "{QUERY_TAG}|{id}|{verb}|{payload}")
            }
        }
    }
}

impl FromStr for PendingItem {
    type Err = WireError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        if let Some(query) = line.strip_prefix("QUERY|") {
            let mut parts = query.splitn(3, '|');
            let id = parts
                .next()
                .ok_or_else(|| WireError::malformed_item("query without id"))?
                .parse::<QueryId>()?;
            let verb = parts
                .next()
                .filter(|verb| !verb.is_empty())
                .ok_or_else(|| WireError::malformed_item("query without verb"))?;
            let payload = parts.next().unwrap_or_default();
            return Ok(Self::query(id, verb, payload));
        }

        let mut parts = line.splitn(2, '|');
        let verb = parts
            .next()
            .filter(|verb| !verb.is_empty())
            .ok_or_else(|| WireError::malformed_item("command without verb"))?;
        let payload = parts.next().unwrap_or_default();
        Ok(Self::command(verb, payload))
    }
}
