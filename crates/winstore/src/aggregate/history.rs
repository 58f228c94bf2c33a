//! Per-key sample history shared by all of the key's windows.

use crate::aggregate::chain::SampleChain;
use crate::aggregate::threshold::{ThresholdBounds, ThresholdNotify};
use crate::aggregate::window::Window;
use crate::clock::Timestamp;
use crate::error::{Result, WinStoreError};
use chrono::TimeDelta;
use std::collections::BTreeMap;
use std::time::Duration;

/// Converts a window period to a chain duration, saturating on overflow.
pub(crate) fn period_delta(period: Duration) -> TimeDelta {
    TimeDelta::from_std(period).unwrap_or(TimeDelta::MAX)
}

/// Canonical sample chain of one data key and the windows viewing it.
///
/// Every new sample is pushed onto the chain and fanned out to every window in
/// name order. The chain itself only retains the longest window period; each
/// window trims its own boundary at least as strictly, so a window's oldest
/// sample is always still in the chain.
#[derive(Debug)]
pub struct KeyHistory {
    data_key: String,
    chain: SampleChain,
    max_period: TimeDelta,
    windows: BTreeMap<String, Window>,
}

impl KeyHistory {
    /// Creates an empty history with no windows.
    pub fn new(data_key: impl Into<String>) -> Self {
        Self {
            data_key: data_key.into(),
            chain: SampleChain::new(),
            max_period: TimeDelta::nanoseconds(1),
            windows: BTreeMap::new(),
        }
    }

    /// Data key this history belongs to.
    pub fn data_key(&self) -> &str {
        &self.data_key
    }

    /// Longest period over all registered windows.
    pub fn max_period(&self) -> TimeDelta {
        self.max_period
    }

    /// Registers a new window.
    pub fn add_window(&mut self, name: &str, period: Duration) -> Result<()> {
        if self.windows.contains_key(name) {
            return Err(WinStoreError::DuplicateWindowKey(name.to_string()));
        }

        let window = Window::new(&*self.data_key, name, period_delta(period));
        self.max_period = self.max_period.max(window.period());
        self.windows.insert(name.to_string(), window);
        Ok(())
    }

    /// Registers a threshold on the named window.
    pub fn add_threshold(
        &mut self,
        name: &str,
        bounds: ThresholdBounds,
        callback: Box<dyn ThresholdNotify>,
    ) -> Result<()> {
        self.window_mut(name)?.add_threshold(bounds, callback)
    }

    /// Adds a sample and updates every window.
    pub fn add_value(&mut self, timestamp: Timestamp, value: f64) {
        let id = self.chain.prepend(timestamp, value);
        for window in self.windows.values_mut() {
            window.add(&self.chain, id);
        }
        self.chain.trim(self.max_period);
    }

    /// Resets every window and recycles the whole chain. Window definitions
    /// and thresholds are kept.
    pub fn reset(&mut self) {
        for window in self.windows.values_mut() {
            window.reset();
        }
        self.chain.reset();
    }

    /// Average of the named window.
    pub fn average(&self, name: &str) -> Result<f64> {
        self.window(name)?.average()
    }

    /// Sample count of the named window.
    pub fn count(&self, name: &str) -> Result<u64> {
        self.window(name)?.count()
    }

    /// Window names in fan-out order.
    pub fn window_names(&self) -> impl Iterator<Item = &str> {
        self.windows.keys().map(String::as_str)
    }

    /// Number of samples retained in the chain.
    pub fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns true if no sample is retained.
    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Number of recycled nodes waiting for reuse.
    pub fn free_len(&self) -> usize {
        self.chain.free_len()
    }

    /// Total number of chain nodes ever allocated.
    pub fn allocated(&self) -> usize {
        self.chain.allocated()
    }

    fn window(&self, name: &str) -> Result<&Window> {
        self.windows
            .get(name)
            .ok_or_else(|| WinStoreError::UnknownWindowKey(name.to_string()))
    }

    fn window_mut(&mut self, name: &str) -> Result<&mut Window> {
        self.windows
            .get_mut(name)
            .ok_or_else(|| WinStoreError::UnknownWindowKey(name.to_string()))
    }
}
