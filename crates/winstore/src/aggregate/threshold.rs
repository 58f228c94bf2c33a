//! Threshold classification of window averages.
//!
//! A [`Threshold`] sorts a value into one of five bands bounded by four
//! breakpoints and notifies its callback whenever the band changes:
//!
//! ```text
//!   LowCritical │ LowWarning │    Normal    │ HighWarning │ HighCritical
//!  ─────────────┼────────────┼──────────────┼─────────────┼─────────────▶
//!        low_critical   low_warning    high_warning   high_critical
//!   (v <= lc)      (v <= lw)      (v < hw)       (v < hc)      (otherwise)
//! ```

use crate::error::{Result, WinStoreError};
use std::fmt;

/// Classification assigned to a window average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThresholdState {
    /// Initial state before any value has been checked.
    #[default]
    Unknown,
    /// At or below the low critical breakpoint.
    LowCritical,
    /// At or below the low warning breakpoint.
    LowWarning,
    /// Between the warning breakpoints.
    Normal,
    /// At or above the high warning breakpoint.
    HighWarning,
    /// At or above the high critical breakpoint.
    HighCritical,
}

impl fmt::Display for ThresholdState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unknown => "Unknown",
            Self::LowCritical => "Low Critical",
            Self::LowWarning => "Low Warning",
            Self::Normal => "Normal",
            Self::HighWarning => "High Warning",
            Self::HighCritical => "High Critical",
        };
        f.write_str(label)
    }
}

/// The four ordered breakpoints of a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdBounds {
    /// Values at or below this are `LowCritical`.
    pub low_critical: f64,
    /// Values at or below this (and above `low_critical`) are `LowWarning`.
    pub low_warning: f64,
    /// Values at or above this (and below `high_critical`) are `HighWarning`.
    pub high_warning: f64,
    /// Values at or above this are `HighCritical`.
    pub high_critical: f64,
}

impl ThresholdBounds {
    /// Creates a new set of breakpoints.
    pub fn new(low_critical: f64, low_warning: f64, high_warning: f64, high_critical: f64) -> Self {
        Self {
            low_critical,
            low_warning,
            high_warning,
            high_critical,
        }
    }

    /// Checks `low_critical <= low_warning <= high_warning <= high_critical`.
    ///
    /// NaN breakpoints never satisfy the ordering.
    pub fn validate(&self) -> Result<()> {
        let ordered = self.low_critical <= self.low_warning
            && self.low_warning <= self.high_warning
            && self.high_warning <= self.high_critical;
        if ordered {
            Ok(())
        } else {
            Err(WinStoreError::InvalidThresholdOrder)
        }
    }

    /// Returns the breakpoints as an array in ascending order.
    pub fn as_array(&self) -> [f64; 4] {
        [
            self.low_critical,
            self.low_warning,
            self.high_warning,
            self.high_critical,
        ]
    }

    /// Classifies a value against these breakpoints.
    pub fn classify(&self, value: f64) -> ThresholdState {
        if value <= self.low_critical {
            ThresholdState::LowCritical
        } else if value <= self.low_warning {
            ThresholdState::LowWarning
        } else if value < self.high_warning {
            ThresholdState::Normal
        } else if value < self.high_critical {
            ThresholdState::HighWarning
        } else {
            ThresholdState::HighCritical
        }
    }
}

/// A classification change delivered to a [`ThresholdNotify`] callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdEvent<'a> {
    /// Data key owning the window.
    pub data_key: &'a str,
    /// Window name.
    pub window_key: &'a str,
    /// Previous classification.
    pub from: ThresholdState,
    /// New classification.
    pub to: ThresholdState,
    /// Window average that caused the change.
    pub value: f64,
}

/// Receiver of threshold classification changes.
///
/// Callbacks run synchronously while the store's write lock is held; they
/// must not call back into the store.
pub trait ThresholdNotify: Send + Sync {
    /// Called once per classification change.
    fn notify(&self, event: &ThresholdEvent<'_>);
}

impl<F> ThresholdNotify for F
where
    F: Fn(&ThresholdEvent<'_>) + Send + Sync,
{
    fn notify(&self, event: &ThresholdEvent<'_>) {
        self(event)
    }
}

/// Stateful classifier attached to a window.
pub struct Threshold {
    data_key: String,
    window_key: String,
    bounds: ThresholdBounds,
    current: ThresholdState,
    callback: Box<dyn ThresholdNotify>,
}

impl Threshold {
    /// Creates a threshold after validating its breakpoint order.
    pub fn new(
        data_key: impl Into<String>,
        window_key: impl Into<String>,
        bounds: ThresholdBounds,
        callback: Box<dyn ThresholdNotify>,
    ) -> Result<Self> {
        bounds.validate()?;
        Ok(Self {
            data_key: data_key.into(),
            window_key: window_key.into(),
            bounds,
            current: ThresholdState::Unknown,
            callback,
        })
    }

    /// Current classification.
    pub fn state(&self) -> ThresholdState {
        self.current
    }

    /// Breakpoints of this threshold.
    pub fn bounds(&self) -> &ThresholdBounds {
        &self.bounds
    }

    /// Classifies `value` and fires the callback if the classification changed.
    pub fn check(&mut self, value: f64) {
        let next = self.bounds.classify(value);
        if next == self.current {
            return;
        }

        let from = std::mem::replace(&mut self.current, next);
        self.callback.notify(&ThresholdEvent {
            data_key: &self.data_key,
            window_key: &self.window_key,
            from,
            to: next,
            value,
        });
    }
}

impl fmt::Debug for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Threshold")
            .field("data_key", &self.data_key)
            .field("window_key", &self.window_key)
            .field("bounds", &self.bounds)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
