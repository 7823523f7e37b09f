//! TCP exchange with the bridge listener.
//!
//! Each exchange opens a fresh connection, writes one request line and reads
//! until the bridge closes the socket.

use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::AppError;

pub(crate) const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Headroom added to the server's query timeout so its own timeout reply
/// arrives before the client gives up.
pub(crate) const READ_TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// Sends `line` to `host:port` and returns the response without its
/// trailing newline.
pub(crate) fn exchange(
    host: &str,
    port: u16,
    line: &str,
    read_timeout: Duration,
) -> Result<String, AppError> {
    let endpoint = format!("{host}:{port}");
    let address = resolve_tcp_address(host, port).map_err(|source| AppError::Resolve {
        endpoint: endpoint.clone(),
        source,
    })?;
    let mut stream = TcpStream::connect_timeout(&address, CONNECTION_TIMEOUT)
        .map_err(|source| AppError::Connect { endpoint, source })?;
    stream
        .set_read_timeout(Some(read_timeout))
        .map_err(AppError::ReadResponse)?;

    stream
        .write_all(format!("{line}\n").as_bytes())
        .and_then(|()| stream.flush())
        .map_err(AppError::SendRequest)?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(AppError::ReadResponse)?;
    let text = String::from_utf8_lossy(&response);
    let text = text.strip_suffix('\n').unwrap_or(text.as_ref());
    if text.is_empty() {
        return Err(AppError::EmptyResponse);
    }
    Ok(text.to_owned())
}

fn resolve_tcp_address(host: &str, port: u16) -> io::Result<SocketAddr> {
    let mut address = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"))?;
    if address.ip().is_unspecified() {
        address.set_ip(loopback_for(address.ip()));
    }
    Ok(address)
}

fn loopback_for(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unspecified_host_resolves_to_loopback() {
        let address = resolve_tcp_address("0.0.0.0", 9999).expect("resolve");
        assert_eq!(address, SocketAddr::from(([127, 0, 0, 1], 9999)));
    }

    #[test]
    fn concrete_hosts_are_kept() {
        let address = resolve_tcp_address("127.0.0.2", 9999).expect("resolve");
        assert_eq!(address.ip(), IpAddr::V4(Ipv4Addr::new(127, 0, 0, 2)));
    }
}
