// src/poll.rs
//! Fixed-interval polling with an injectable sleeper.
//!
//! External jobs give no completion callback, so we look for their output
//! every `interval` until it shows up. There is no backoff. By default there
//! is no limit either: a job that never finishes has to be killed by the
//! operator.

use std::time::Duration;
use tracing::trace;

use crate::error::{BenchError, Result};

/// Something that can wait. Real runs sleep the thread; tests record the
/// requested delays instead.
pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Poller {
    pub interval: Duration,
    /// Stop with [`BenchError::PollExhausted`] after this many attempts
    pub max_attempts: Option<u32>,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Call `check` until it returns `Some`, sleeping `interval` between
    /// calls. The check gets the 1-based attempt number. Errors from `check`
    /// end the loop immediately.
    pub fn poll<T, F>(&self, sleeper: &dyn Sleeper, mut check: F) -> Result<T>
    where
        F: FnMut(u32) -> Result<Option<T>>,
    {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            if let Some(value) = check(attempt)? {
                return Ok(value);
            }
            if let Some(max) = self.max_attempts {
                if attempt >= max {
                    return Err(BenchError::PollExhausted(attempt));
                }
            }
            trace!("poll attempt {} not ready, sleeping {:?}", attempt, self.interval);
            sleeper.sleep(self.interval);
        }
    }
}
