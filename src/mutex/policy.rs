//! Backoff policy for sentinel acquisition.

use std::time::Duration;

/// Fixed-quantum polling policy: try up to `attempts` times, sleeping
/// `quantum` between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexPolicy {
    /// Sleep between two creation attempts.
    pub quantum: Duration,

    /// Total number of creation attempts before giving up.
    pub attempts: u32,
}

impl MutexPolicy {
    pub const fn new(quantum: Duration, attempts: u32) -> Self {
        Self { quantum, attempts }
    }

    /// The historical two-tier rule for a wait of `units` seconds.
    ///
    /// Short waits (under 10 units) poll every 100 ms, `10 × units` times;
    /// longer waits poll every second, `units` times.
    pub fn tiered(units: u32) -> Self {
        let units = units.max(1);
        if units < 10 {
            Self::new(Duration::from_millis(100), units * 10)
        } else {
            Self::new(Duration::from_secs(1), units)
        }
    }

    /// A wait of `units` seconds polled at an explicit quantum.
    ///
    /// The attempt count grows with the wait, never the single sleep.
    pub fn with_quantum(units: u32, quantum: Duration) -> Self {
        let quantum_ms = quantum.as_millis().max(1);
        let wait_ms = u128::from(units.max(1)) * 1000;
        let attempts = wait_ms.div_ceil(quantum_ms).clamp(1, u128::from(u32::MAX)) as u32;
        Self::new(quantum, attempts)
    }

    /// Upper bound on time spent sleeping before a timeout.
    pub fn max_wait(&self) -> Duration {
        self.quantum * self.attempts.saturating_sub(1)
    }
}
