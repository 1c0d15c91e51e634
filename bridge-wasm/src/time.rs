//! `performance.now()` clock.

use bridge_traits::{
    error::{BridgeError, Result as BridgeResult},
    time::Clock,
};
use web_sys::Performance;

/// Monotonic clock backed by the page's `Performance` object.
pub struct PerformanceClock {
    performance: Performance,
}

impl PerformanceClock {
    /// Bind to the current window's performance timer.
    pub fn new() -> BridgeResult<Self> {
        let performance = web_sys::window()
            .and_then(|window| window.performance())
            .ok_or_else(|| BridgeError::NotAvailable("performance".to_string()))?;
        Ok(Self { performance })
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> f64 {
        self.performance.now() / 1000.0
    }
}
