//! Shared test fixtures: a scripted in-memory transport, a tiny executor
//! and a deterministic clock.

use crate::error::NetworkError;
use crate::network::Transport;
use crate::time::TimeSource;
use core::cell::Cell;
use core::future::Future;
use core::pin::pin;
use core::task::{Context, Poll, Waker};
use std::vec::Vec;

/// Drive a future to completion. The mock transport never returns
/// `Poll::Pending`, so a bare poll loop is all the tests need.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut cx = Context::from_waker(Waker::noop());
    let mut future = pin!(future);
    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
    }
}

/// Scripted transport: reads serve a canned byte sequence, writes are
/// captured for assertion. Exhausting the script reads as a closed peer.
pub struct MockTransport {
    rx: Vec<u8>,
    pos: usize,
    pub written: Vec<u8>,
    pub closed: bool,
    pub fail_writes: bool,
    chunk: usize,
}

impl MockTransport {
    pub fn incoming(bytes: &[u8]) -> Self {
        MockTransport {
            rx: bytes.to_vec(),
            pos: 0,
            written: Vec::new(),
            closed: false,
            fail_writes: false,
            chunk: usize::MAX,
        }
    }

    pub fn empty() -> Self {
        Self::incoming(&[])
    }

    /// Limit each read call to at most `n` bytes to exercise short reads.
    pub fn chunked(mut self, n: usize) -> Self {
        self.chunk = n;
        self
    }

    /// Append more scripted bytes for the peer to "send".
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.rx.extend_from_slice(bytes);
    }

    pub fn unread(&self) -> usize {
        self.rx.len() - self.pos
    }
}

impl Transport for MockTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetworkError> {
        if self.pos >= self.rx.len() {
            return Ok(0);
        }
        let n = buf.len().min(self.chunk).min(self.rx.len() - self.pos);
        buf[..n].copy_from_slice(&self.rx[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    async fn write(&mut self, buf: &[u8]) -> Result<usize, NetworkError> {
        if self.fail_writes {
            return Err(NetworkError::WriteFailed);
        }
        self.written.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), NetworkError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), NetworkError> {
        self.closed = true;
        Ok(())
    }
}

/// Clock that advances a fixed step on every reading, so deadline loops
/// terminate deterministically.
pub struct TestClock {
    now: Cell<u64>,
    step: u64,
}

impl TestClock {
    pub fn ticking(now: u64, step: u64) -> Self {
        TestClock {
            now: Cell::new(now),
            step,
        }
    }
}

impl TimeSource for TestClock {
    fn now_millis(&self) -> u64 {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}
