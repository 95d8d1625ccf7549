//! Transport abstraction - a reliable, ordered, bidirectional byte stream.

use crate::error::{NetworkError, Result};

/// Byte stream trait the engines drive.
///
/// Implementations wrap a concrete transport (TCP, WebSocket, UART). The
/// engines assume reliable in-order delivery and never frame against
/// datagram semantics.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Read up to `buf.len()` bytes. Returns the number of bytes read;
    /// 0 means the peer closed the stream.
    async fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, NetworkError>;

    /// Write up to `buf.len()` bytes. Returns the number of bytes written.
    async fn write(&mut self, buf: &[u8]) -> core::result::Result<usize, NetworkError>;

    /// Flush any transport-level write buffering.
    async fn flush(&mut self) -> core::result::Result<(), NetworkError>;

    /// Close the stream.
    async fn close(&mut self) -> core::result::Result<(), NetworkError>;
}

/// Read exactly `buf.len()` bytes, looping over short reads.
pub async fn read_full<T: Transport>(transport: &mut T, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match transport.read(&mut buf[filled..]).await? {
            0 => return Err(NetworkError::ConnectionClosed.into()),
            n => filled += n,
        }
    }
    Ok(())
}

/// Write all of `buf`, looping over short writes.
pub async fn write_full<T: Transport>(transport: &mut T, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        match transport.write(&buf[written..]).await? {
            0 => return Err(NetworkError::ConnectionClosed.into()),
            n => written += n,
        }
    }
    Ok(())
}
