//! Host-side handler registry.
//!
//! Handlers are plain functions over the host state `H`. The registry is
//! built once at startup; registering a verb twice is rejected so the set of
//! operations a host supports is known before the first tick.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Failure reported by a host handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Message delivered to logs or, for queries, to the client.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The verb already has a handler.
    #[error("verb '{verb}' is registered more than once")]
    DuplicateVerb { verb: String },
}

/// Mutating handler invoked for a queued command.
pub type CommandHandler<H> = Box<dyn Fn(&mut H, &str) -> Result<(), HandlerError> + Send>;

/// Reading handler invoked for a queued query.
pub type QueryHandler<H> = Box<dyn Fn(&mut H, &str) -> Result<String, HandlerError> + Send>;

/// Verb-indexed command and query handlers for host state `H`.
pub struct HandlerRegistry<H> {
    commands: HashMap<String, CommandHandler<H>>,
    queries: HashMap<String, QueryHandler<H>>,
}

impl<H> HandlerRegistry<H> {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder<H> {
        RegistryBuilder::default()
    }

    /// Command handler for `verb`.
    pub fn command(&self, verb: &str) -> Option<&CommandHandler<H>> {
        self.commands.get(&verb.to_lowercase())
    }

    /// Query handler for `verb`.
    pub fn query(&self, verb: &str) -> Option<&QueryHandler<H>> {
        self.queries.get(&verb.to_lowercase())
    }

    /// Sorted names of registered commands.
    pub fn command_verbs(&self) -> Vec<&str> {
        sorted_keys(&self.commands)
    }

    /// Sorted names of registered queries.
    pub fn query_verbs(&self) -> Vec<&str> {
        sorted_keys(&self.queries)
    }
}

impl<H> fmt::Debug for HandlerRegistry<H> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("HandlerRegistry")
            .field("commands", &self.command_verbs())
            .field("queries", &self.query_verbs())
            .finish()
    }
}

fn sorted_keys<V>(map: &HashMap<String, V>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

/// Builder for [`HandlerRegistry`].
pub struct RegistryBuilder<H> {
    commands: HashMap<String, CommandHandler<H>>,
    queries: HashMap<String, QueryHandler<H>>,
}

impl<H> Default for RegistryBuilder<H> {
    fn default() -> Self {
        Self {
            commands: HashMap::new(),
            queries: HashMap::new(),
        }
    }
}

impl<H> RegistryBuilder<H> {
    /// Registers a command handler.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateVerb`] when `verb` already has a
    /// command or query handler.
    pub fn command<F>(mut self, verb: &str, handler: F) -> Result<Self, RegistryError>
    where
        F: Fn(&mut H, &str) -> Result<(), HandlerError> + Send + 'static,
    {
        let verb = self.claim(verb)?;
        self.commands.insert(verb, Box::new(handler));
        Ok(self)
    }

    /// Registers a query handler.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateVerb`] when `verb` already has a
    /// command or query handler.
    pub fn query<F>(mut self, verb: &str, handler: F) -> Result<Self, RegistryError>
    where
        F: Fn(&mut H, &str) -> Result<String, HandlerError> + Send + 'static,
    {
        let verb = self.claim(verb)?;
        self.queries.insert(verb, Box::new(handler));
        Ok(self)
    }

    /// Finishes the registry.
    pub fn build(self) -> HandlerRegistry<H> {
        HandlerRegistry {
            commands: self.commands,
            queries: self.queries,
        }
    }

    fn claim(&self, verb: &str) -> Result<String, RegistryError> {
        let verb = verb.to_lowercase();
        if self.commands.contains_key(&verb) || self.queries.contains_key(&verb) {
            return Err(RegistryError::DuplicateVerb { verb });
        }
        Ok(verb)
    }
}
