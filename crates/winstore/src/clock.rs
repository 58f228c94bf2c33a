//! Time source for record timestamps.
//!
//! Timestamps are local wall-clock times without an offset, which is what the
//! log records carry. The store asks its [`Clock`] for "now" on every write and
//! on every history query, so tests can drive it with a [`StepClock`].

use chrono::{Local, NaiveDateTime, TimeDelta};
use std::sync::Mutex;

/// Local wall-clock timestamp with nanosecond resolution.
pub type Timestamp = NaiveDateTime;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current local time.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the operating system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().naive_local()
    }
}

/// Deterministic clock that returns its current instant and then advances by a
/// fixed step.
///
/// # Examples
/// ```rust,ignore
/// use alopex_winstore::clock::{Clock, StepClock};
/// use chrono::TimeDelta;
///
/// let clock = StepClock::new(start, TimeDelta::seconds(1));
/// let first = clock.now();
/// assert_eq!(clock.now(), first + TimeDelta::seconds(1));
/// ```
#[derive(Debug)]
pub struct StepClock {
    next: Mutex<Timestamp>,
    step: TimeDelta,
}

impl StepClock {
    /// Creates a clock whose first reading is `start`.
    pub fn new(start: Timestamp, step: TimeDelta) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }

    /// Moves the clock so that its next reading is `next`.
    pub fn set(&self, next: Timestamp) {
        *self.next.lock().unwrap_or_else(|err| err.into_inner()) = next;
    }

    /// Returns the next reading without advancing.
    pub fn peek(&self) -> Timestamp {
        *self.next.lock().unwrap_or_else(|err| err.into_inner())
    }
}

impl Clock for StepClock {
    fn now(&self) -> Timestamp {
        let mut next = self.next.lock().unwrap_or_else(|err| err.into_inner());
        let current = *next;
        *next = current + self.step;
        current
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
