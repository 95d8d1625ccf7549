//! # PicoClient Tokio
//!
//! Tokio runtime support for PicoClient.
//!
//! This crate provides async networking and time implementations for the
//! standard library using Tokio. It re-exports all types from
//! `picoclient-core` for convenience.

// Re-export core for convenience
pub use picoclient_core::*;

use picoclient_core::error::NetworkError;
use tokio::net::TcpStream as TokioTcpStreamInner;

const DEFAULT_DECODER_BUFFER: usize = 4096;
const DEFAULT_TX_BUFFER: usize = 1024;
const DEFAULT_MAX_SUBSCRIPTIONS: usize = 16;
const DEFAULT_MAX_FILTERS: usize = 8;
const DEFAULT_FILTER_LENGTH: usize = 64;

/// Client over TCP with the default capacities: a 4 KiB decode buffer,
/// 1 KiB transmit staging, 16 subscriptions of up to 64 bytes each and 8
/// filters per SUBSCRIBE.
pub type DefaultTokioClient<P> = Client<
    TokioTcpStream,
    StdTimeSource,
    TokioDelay,
    NoAllocDecoder<DEFAULT_DECODER_BUFFER>,
    P,
    DEFAULT_MAX_SUBSCRIPTIONS,
    DEFAULT_MAX_FILTERS,
    DEFAULT_FILTER_LENGTH,
    DEFAULT_TX_BUFFER,
>;

/// Build a [`DefaultTokioClient`] around a publish handler.
pub fn default_client<P: PublishHandler>(publisher: P) -> DefaultTokioClient<P> {
    Client::new(NoAllocDecoder::new(), publisher, StdTimeSource, TokioDelay)
}

/// Tokio TCP stream wrapper
///
/// Wraps tokio's TCP stream for use with the Transport trait
pub struct TokioTcpStream {
    inner: TokioTcpStreamInner,
}

impl TokioTcpStream {
    /// Connect to the given broker address ("host:port").
    pub async fn connect(addr: &str) -> std::result::Result<Self, std::io::Error> {
        let stream = TokioTcpStreamInner::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(TokioTcpStream { inner: stream })
    }

    /// Create a new TokioTcpStream from a tokio TcpStream
    pub fn from_tcp_stream(stream: TokioTcpStreamInner) -> Self {
        TokioTcpStream { inner: stream }
    }

    /// Get the inner tokio TcpStream
    pub fn inner(&self) -> &TokioTcpStreamInner {
        &self.inner
    }

    /// Get mutable reference to the inner tokio TcpStream
    pub fn inner_mut(&mut self) -> &mut TokioTcpStreamInner {
        &mut self.inner
    }
}

impl Transport for TokioTcpStream {
    async fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, NetworkError> {
        use tokio::io::AsyncReadExt;
        self.inner.read(buf).await.map_err(|_| NetworkError::ReadFailed)
    }

    async fn write(&mut self, buf: &[u8]) -> std::result::Result<usize, NetworkError> {
        use tokio::io::AsyncWriteExt;
        self.inner
            .write(buf)
            .await
            .map_err(|_| NetworkError::WriteFailed)
    }

    async fn flush(&mut self) -> std::result::Result<(), NetworkError> {
        use tokio::io::AsyncWriteExt;
        self.inner
            .flush()
            .await
            .map_err(|_| NetworkError::FlushFailed)
    }

    async fn close(&mut self) -> std::result::Result<(), NetworkError> {
        use tokio::io::AsyncWriteExt;
        self.inner
            .shutdown()
            .await
            .map_err(|_| NetworkError::CloseFailed)
    }
}

/// Standard library time source
#[derive(Debug, Clone, Copy)]
pub struct StdTimeSource;

impl TimeSource for StdTimeSource {
    fn now_millis(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Tokio-based delay implementation
#[derive(Debug, Clone, Copy)]
pub struct TokioDelay;

impl Delay for TokioDelay {
    async fn sleep_ms(&self, millis: u64) {
        use tokio::time::{sleep, Duration};
        sleep(Duration::from_millis(millis)).await;
    }
}
