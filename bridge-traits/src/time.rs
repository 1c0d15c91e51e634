//! Time Abstractions
//!
//! Provides an injectable monotonic time source so playback position math can be
//! driven by a real clock in production and by a manual clock in tests.

use parking_lot::Mutex;

use crate::platform::PlatformSendSync;

/// Monotonic time source.
///
/// Values are seconds since an arbitrary, fixed origin. Only differences
/// between two readings are meaningful.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::time::Clock;
///
/// fn elapsed_since(clock: &dyn Clock, checkpoint: f64) -> f64 {
///     clock.now() - checkpoint
/// }
/// ```
pub trait Clock: PlatformSendSync {
    /// Current time in seconds.
    fn now(&self) -> f64;

    /// Current time in whole milliseconds.
    fn now_millis(&self) -> u64 {
        (self.now().max(0.0) * 1000.0) as u64
    }
}

/// System clock backed by [`std::time::Instant`].
///
/// Not available on `wasm32`, where `Instant` is unsupported; the web bridge
/// ships a `performance.now()` based clock instead.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced clock for deterministic tests and headless hosts.
#[derive(Debug, Default)]
pub struct ManualClock {
    seconds: Mutex<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at an arbitrary reading.
    pub fn starting_at(seconds: f64) -> Self {
        Self {
            seconds: Mutex::new(seconds),
        }
    }

    /// Move the clock forward. Negative or non-finite deltas are ignored.
    pub fn advance(&self, seconds: f64) {
        if seconds.is_finite() && seconds > 0.0 {
            *self.seconds.lock() += seconds;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.seconds.lock()
    }
}
