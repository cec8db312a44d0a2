//! Capped exponential retry delay for market-data requests.

use std::time::Duration;

pub const DEFAULT_BASE: Duration = Duration::from_millis(100);
pub const DEFAULT_CAP: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    current: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_BASE, DEFAULT_CAP)
    }
}

impl Backoff {
    pub fn new(base: Duration, cap: Duration) -> Self {
        let base = base.min(cap);
        Backoff {
            base,
            cap,
            current: base,
        }
    }

    /// Delay to wait before the next attempt. Each call doubles the
    /// following delay up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.cap);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }

    pub fn peek(&self) -> Duration {
        self.current
    }
}
