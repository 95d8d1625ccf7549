//! Time abstraction for different platforms

/// Time source trait
///
/// Abstracts time operations for both std and embedded platforms.
/// Session timestamps treat 0 as "unset", so implementations backing a live
/// client should report a nonzero epoch.
pub trait TimeSource {
    /// Get current time in milliseconds since an arbitrary fixed epoch
    fn now_millis(&self) -> u64;
}

/// Default time source for no_std (returns 0)
#[derive(Debug, Clone, Copy)]
pub struct DummyTimeSource;

impl TimeSource for DummyTimeSource {
    fn now_millis(&self) -> u64 {
        0
    }
}

/// Delay trait for abstracting sleep/delay functionality
#[allow(async_fn_in_trait)]
pub trait Delay {
    /// Async sleep for the specified duration in milliseconds
    async fn sleep_ms(&self, millis: u64);
}

/// Delay that yields without sleeping, for tests and busy-poll loops.
#[derive(Debug, Clone, Copy)]
pub struct NoopDelay;

impl Delay for NoopDelay {
    async fn sleep_ms(&self, _millis: u64) {}
}
