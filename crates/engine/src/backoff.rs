// SPDX-License-Identifier: MIT

//! Exponential back-off for empty dispatch polls (§5 "Back-off").

use std::time::Duration;

/// Doubles from 1 poll interval up to `max`, reset to zero on any successful
/// claim.
#[derive(Debug, Clone)]
pub struct Backoff {
    attempt: u32,
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { attempt: 0, base, max }
    }

    /// §5: "Empty dispatch ⇒ exponential back-off capped by `maxPollSeconds`."
    pub fn next_delay(&mut self) -> Duration {
        let factor = 1u32.checked_shl(self.attempt).unwrap_or(u32::MAX);
        let delay = self.base.saturating_mul(factor).min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
