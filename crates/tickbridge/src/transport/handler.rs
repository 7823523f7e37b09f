//! Connection handling abstractions for the bridge listener.

use std::io::{self, Read};
use std::net::TcpStream;

use crate::wire::WireError;

/// Largest request line accepted from a client.
pub(crate) const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream);
}

/// Reads one request line, up to and including `\n`, or whatever arrived
/// before the peer closed its write half.
///
/// Returns `Ok(None)` when the peer closed without sending anything.
pub(crate) fn read_request_line<R: Read>(stream: &mut R) -> Result<Option<Vec<u8>>, WireError> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let bytes_read = read_chunk_with_retry(stream, &mut chunk)?;
        if bytes_read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }

        let received = &chunk[..bytes_read];
        if let Some(pos) = received.iter().position(|byte| *byte == b'\n') {
            buffer.extend_from_slice(&received[..=pos]);
            enforce_request_limit(buffer.len())?;
            return Ok(Some(buffer));
        }

        buffer.extend_from_slice(received);
        enforce_request_limit(buffer.len())?;
    }
}

fn read_chunk_with_retry<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_request_limit(size: usize) -> Result<(), WireError> {
    if size > MAX_REQUEST_BYTES {
        return Err(WireError::request_too_large(size, MAX_REQUEST_BYTES));
    }
    Ok(())
}
