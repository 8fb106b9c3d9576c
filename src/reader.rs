//! Deadline-bounded reads from a live connection.

use std::io;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

/// Reads from `stream` until `max_bytes` have arrived, `timeout` has
/// elapsed, or the peer closes its side.
///
/// Waits for readiness, then takes whatever one non-blocking read yields.
/// Every wait is bounded by the initial deadline, so the call never
/// outlives it. End of stream is not an error: the bytes read so far are
/// returned, possibly none.
pub(crate) async fn read_with_timeout(
    stream: &TcpStream,
    max_bytes: usize,
    timeout: Duration,
) -> io::Result<BytesMut> {
    let deadline = Instant::now() + timeout;
    let mut buf = BytesMut::with_capacity(max_bytes.min(8 * 1024));

    while buf.len() < max_bytes {
        match timeout_at(deadline, stream.readable()).await {
            Err(_elapsed) => break,
            Ok(ready) => ready?,
        }

        let remaining = max_bytes - buf.len();
        match stream.try_read_buf(&mut (&mut buf).limit(remaining)) {
            Ok(0) => break,
            Ok(_) => {}
            // Readiness can be spurious; wait again.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e),
        }
    }

    Ok(buf)
}
