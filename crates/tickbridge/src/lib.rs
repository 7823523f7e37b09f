//! Remote-control bridge into a single-threaded host loop.
//!
//! Network clients send one line of text per TCP connection. Commands are
//! queued and acknowledged at once; queries block their connection until the
//! host answers. The host never shares its state with the network threads:
//! it calls [`HostDispatcher::tick`] once per update, which drains at most one
//! item from the [`PendingQueue`] and runs the matching handler from its
//! [`HandlerRegistry`] on the host's own thread.
//!
//! ```text
//! client ── socket ──▶ BridgeConnectionHandler ──▶ PendingQueue ──▶ HostDispatcher::tick
//!    ▲                        │  (queries wait)                          │
//!    └──── one line ◀─────────┴──────────── CorrelationTable ◀───────────┘
//! ```
//!
//! [`bootstrap_with`] wires the pieces from configuration; `tickbridged`
//! drives the in-memory [`SandboxHost`] with them.

mod bootstrap;
mod connection;
mod correlation;
mod dispatcher;
mod levels;
mod process;
mod queue;
mod registry;
mod reporter;
mod sandbox;
mod server;
pub mod telemetry;
mod transport;
mod verbs;
pub mod wire;

pub use bootstrap::{
    BootstrapError, Bridge, ConfigLoader, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use connection::{BridgeConnectionHandler, ConnectionSettings};
pub use correlation::{CorrelationError, CorrelationTable, WaitHandle};
pub use dispatcher::{HostDispatcher, TickOutcome};
pub use levels::{LevelsError, list_levels};
pub use process::{LaunchError, LoopExit, TICK_INTERVAL, run_daemon, run_host_loop};
pub use queue::PendingQueue;
pub use registry::{
    CommandHandler, HandlerError, HandlerRegistry, QueryHandler, RegistryBuilder, RegistryError,
};
pub use reporter::{BridgeReporter, StructuredReporter};
pub use sandbox::{Camera, CodeWindow, Execution, SandboxHost};
pub use server::{BridgeServer, ServerError};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;
pub use verbs::{CatalogError, DirectVerb, PayloadShape, VerbCatalog, VerbKind, VerbSpec};

#[cfg(test)]
mod tests;
