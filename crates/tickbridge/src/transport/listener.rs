//! Listener implementation for the bridge's TCP endpoint.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{ConnectionHandler, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Listener bound to a TCP address.
#[derive(Debug)]
pub(crate) struct SocketListener {
    addr: SocketAddr,
    listener: TcpListener,
}

impl SocketListener {
    /// Resolves `host:port` and binds the first address.
    pub(crate) fn bind(host: &str, port: u16) -> Result<Self, ListenerError> {
        let listener = bind_tcp(host, port)?;
        let addr = listener
            .local_addr()
            .map_err(|source| ListenerError::LocalAddr { source })?;
        Ok(Self { addr, listener })
    }

    /// Address actually bound, with an ephemeral port resolved.
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts the accept loop on a background thread.
    ///
    /// The listening socket is owned by that thread and closed when it exits.
    pub(crate) fn start(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let addr = self.local_addr();
        let handle = thread::Builder::new()
            .name("tickbridge-accept".to_owned())
            .spawn(move || run_accept_loop(self, &shutdown_flag, handler))
            .map_err(|source| ListenerError::Spawn { source })?;
        Ok(ListenerHandle {
            addr,
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
#[derive(Debug)]
pub(crate) struct ListenerHandle {
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Address the listener is bound to.
    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Asks the accept loop to exit at its next poll.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Joins the accept loop without waiting longer than `bound`.
    ///
    /// Returns `Ok(true)` once the thread has exited and the port is free,
    /// `Ok(false)` when the bound elapsed first; the thread is then left
    /// detached and exits on its own.
    pub(crate) fn join_within(mut self, bound: Duration) -> Result<bool, ListenerError> {
        let Some(handle) = self.handle.take() else {
            return Ok(true);
        };
        let deadline = Instant::now() + bound;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(
                    target: LISTENER_TARGET,
                    addr = %self.addr,
                    "listener thread did not exit within bound"
                );
                return Ok(false);
            }
            thread::sleep(JOIN_POLL);
        }
        handle.join().map(|()| true).map_err(|_| ListenerError::ThreadPanic)
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: SocketListener,
    shutdown: &AtomicBool,
    handler: Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        addr = %listener.addr,
        "socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&listener.listener) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                debug!(target: LISTENER_TARGET, peer = %peer, "accepted connection");
                let handler = Arc::clone(&handler);
                thread::spawn(move || handler.handle(stream));
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(
        target: LISTENER_TARGET,
        addr = %listener.addr,
        "socket listener closed"
    );
}

fn accept_connection(listener: &TcpListener) -> io::Result<Option<(TcpStream, SocketAddr)>> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    let addr = addrs.next().ok_or_else(|| ListenerError::ResolveEmpty {
        host: host.to_string(),
        port,
    })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}
