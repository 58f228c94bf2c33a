//! Bounded-duration view over a key's sample chain.

use crate::aggregate::chain::{NodeId, SampleChain};
use crate::aggregate::threshold::{Threshold, ThresholdBounds, ThresholdNotify};
use crate::error::{Result, WinStoreError};
use chrono::TimeDelta;

/// A named window tracking count and average over the last `period` of samples.
///
/// The window never owns chain nodes; it keeps the ids of its newest and oldest
/// samples and walks its oldest boundary towards newer samples as they age out.
/// The newest sample is always retained, however old it is.
#[derive(Debug)]
pub struct Window {
    data_key: String,
    name: String,
    period: TimeDelta,
    newest: Option<NodeId>,
    oldest: Option<NodeId>,
    count: u64,
    sum: f64,
    average: f64,
    thresholds: Vec<Threshold>,
}

impl Window {
    /// Creates an empty window. Periods below one nanosecond are raised to one
    /// nanosecond.
    pub fn new(data_key: impl Into<String>, name: impl Into<String>, period: TimeDelta) -> Self {
        Self {
            data_key: data_key.into(),
            name: name.into(),
            period: period.max(TimeDelta::nanoseconds(1)),
            newest: None,
            oldest: None,
            count: 0,
            sum: 0.0,
            average: 0.0,
            thresholds: Vec::new(),
        }
    }

    /// Window name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Window period.
    pub fn period(&self) -> TimeDelta {
        self.period
    }

    /// Registers a threshold evaluated against the average on every add.
    pub fn add_threshold(
        &mut self,
        bounds: ThresholdBounds,
        callback: Box<dyn ThresholdNotify>,
    ) -> Result<()> {
        let threshold = Threshold::new(&*self.data_key, &*self.name, bounds, callback)?;
        self.thresholds.push(threshold);
        Ok(())
    }

    /// Includes the chain node `id` as the newest sample of this window.
    pub fn add(&mut self, chain: &SampleChain, id: NodeId) {
        self.newest = Some(id);
        if self.oldest.is_none() {
            self.oldest = Some(id);
        }

        self.count += 1;
        self.sum += chain.value(id);
        self.trim(chain);
        self.average = self.sum / self.count as f64;

        for threshold in &mut self.thresholds {
            threshold.check(self.average);
        }
    }

    fn trim(&mut self, chain: &SampleChain) {
        let Some(newest) = self.newest else {
            return;
        };
        let newest_ts = chain.timestamp(newest);

        while let Some(oldest) = self.oldest {
            if oldest == newest || newest_ts - chain.timestamp(oldest) <= self.period {
                return;
            }
            let Some(newer) = chain.newer(oldest) else {
                return;
            };

            self.count -= 1;
            self.sum -= chain.value(oldest);
            self.oldest = Some(newer);
        }
    }

    /// Forgets every sample. The chain itself is left untouched.
    pub fn reset(&mut self) {
        self.newest = None;
        self.oldest = None;
        self.count = 0;
        self.sum = 0.0;
        self.average = 0.0;
    }

    /// Average of the retained samples.
    pub fn average(&self) -> Result<f64> {
        if self.count == 0 {
            return Err(WinStoreError::NoWindowData);
        }
        Ok(self.average)
    }

    /// Number of retained samples.
    pub fn count(&self) -> Result<u64> {
        if self.count == 0 {
            return Err(WinStoreError::NoWindowData);
        }
        Ok(self.count)
    }

    /// Oldest retained chain node.
    pub fn oldest(&self) -> Option<NodeId> {
        self.oldest
    }
}
