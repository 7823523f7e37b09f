//! Process runtime for `tickbridged`: the host loop on the main thread.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::flag;
use thiserror::Error;
use tracing::info;

use crate::bootstrap::{BootstrapError, ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::dispatcher::HostDispatcher;
use crate::registry::RegistryError;
use crate::reporter::{BridgeReporter, StructuredReporter};
use crate::sandbox::SandboxHost;
use crate::server::ServerError;
use crate::verbs::VerbCatalog;

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");

/// Interval between host ticks.
pub const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Errors surfaced while launching or running the host process.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Installing the termination signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Signals {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// The host's handler registry is inconsistent.
    #[error("invalid host handler registry: {0}")]
    Registry(#[from] RegistryError),
    /// The server could not be stopped cleanly.
    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Why the host loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A termination signal was received.
    Signal,
    /// The host processed `exitgame`.
    HostRequested,
}

/// Runs the reference host with the production collaborators until
/// `SIGINT`, `SIGTERM` or `exitgame`.
pub fn run_daemon() -> Result<(), LaunchError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        flag::register(signal, Arc::clone(&shutdown))
            .map_err(|source| LaunchError::Signals { source })?;
    }
    let reporter: Arc<dyn BridgeReporter> = Arc::new(StructuredReporter::new());
    run_daemon_with(&SystemConfigLoader, reporter, &shutdown).map(|_| ())
}

/// Runs the reference host with injected collaborators.
pub(crate) fn run_daemon_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn BridgeReporter>,
    shutdown: &AtomicBool,
) -> Result<LoopExit, LaunchError> {
    let bridge = bootstrap_with(loader, reporter, VerbCatalog::builtin())?;
    let dispatcher = bridge.dispatcher(SandboxHost::registry()?);
    let mut host = SandboxHost::new(bridge.config().saves_dir());

    info!(
        target: PROCESS_TARGET,
        listening = ?bridge.server().local_addr(),
        tick_ms = TICK_INTERVAL.as_millis(),
        "host loop running"
    );
    let exit = run_host_loop(&dispatcher, &mut host, shutdown, TICK_INTERVAL);
    bridge.stop()?;
    info!(
        target: PROCESS_TARGET,
        reason = ?exit,
        "shutdown sequence completed"
    );
    Ok(exit)
}

/// Ticks `host` at a fixed rate until `shutdown` is raised or the host asks
/// to exit. Each tick dispatches at most one bridge item, then advances the
/// simulation.
pub fn run_host_loop(
    dispatcher: &HostDispatcher<SandboxHost>,
    host: &mut SandboxHost,
    shutdown: &AtomicBool,
    interval: Duration,
) -> LoopExit {
    let mut next_tick = Instant::now();
    loop {
        if shutdown.load(Ordering::SeqCst) {
            return LoopExit::Signal;
        }
        dispatcher.tick(host);
        if host.exit_requested() {
            return LoopExit::HostRequested;
        }
        host.advance();

        next_tick += interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            // Fell behind; do not try to catch up with a burst of ticks.
            next_tick = now;
        }
    }
}
