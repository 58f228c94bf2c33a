//! Typed front-ends over the raw string store.
//!
//! A [`TypedStore`] owns a [`LogStore`] and a [`ValueCodec`]. The codec turns
//! typed values into the stored text, validates text read back, and projects
//! each value to the `f64` sample its windows aggregate. The same projection is
//! installed for replay, so windows rebuilt on open see exactly the samples
//! live updates fed them.
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_winstore::typed::{BoolCodec, TypedStore};
//! use alopex_winstore::StoreConfig;
//!
//! let store = TypedStore::new(StoreConfig::new(dir, "door"), BoolCodec);
//! store.add_window("door.open", "10m", Duration::from_secs(600))?;
//! store.open()?;
//! store.update("door.open", true)?;
//! ```

pub mod codec;

pub use codec::{BoolCodec, FloatCodec, IntegerCodec, StringCodec};

use crate::aggregate::{ThresholdBounds, ThresholdNotify};
use crate::clock::{Clock, Timestamp};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::log::{Action, LogStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Conversion between a typed value and its stored text.
pub trait ValueCodec: Send + Sync + 'static {
    /// Type of the stored values.
    type Value;

    /// Encodes `value` for storage, rejecting values the codec does not allow.
    fn encode(&self, value: &Self::Value) -> Result<String>;

    /// Decodes stored text.
    fn decode(&self, raw: &str) -> Result<Self::Value>;

    /// Numeric sample fed to windows for `value`.
    fn project(&self, value: &Self::Value) -> f64;

    /// Checks threshold breakpoints against the codec's value range.
    fn check_thresholds(&self, _bounds: &ThresholdBounds) -> Result<()> {
        Ok(())
    }
}

/// Boolean store.
pub type BoolStore = TypedStore<BoolCodec>;
/// `i8` store.
pub type Int8Store = TypedStore<IntegerCodec<i8>>;
/// `i16` store.
pub type Int16Store = TypedStore<IntegerCodec<i16>>;
/// `i32` store.
pub type Int32Store = TypedStore<IntegerCodec<i32>>;
/// `i64` store.
pub type Int64Store = TypedStore<IntegerCodec<i64>>;
/// `isize` store.
pub type IntStore = TypedStore<IntegerCodec<isize>>;
/// `u8` store.
pub type Uint8Store = TypedStore<IntegerCodec<u8>>;
/// `u16` store.
pub type Uint16Store = TypedStore<IntegerCodec<u16>>;
/// `u32` store.
pub type Uint32Store = TypedStore<IntegerCodec<u32>>;
/// `u64` store.
pub type Uint64Store = TypedStore<IntegerCodec<u64>>;
/// `usize` store.
pub type UintStore = TypedStore<IntegerCodec<usize>>;
/// `f32` store.
pub type Float32Store = TypedStore<FloatCodec<f32>>;
/// `f64` store.
pub type Float64Store = TypedStore<FloatCodec<f64>>;
/// String store.
pub type StringStore = TypedStore<StringCodec>;

/// A [`LogStore`] holding values of one type.
pub struct TypedStore<C: ValueCodec> {
    store: LogStore,
    codec: Arc<C>,
}

impl<C: ValueCodec> TypedStore<C> {
    /// Creates a closed store using the system clock.
    pub fn new(config: StoreConfig, codec: C) -> Self {
        Self::with_store(LogStore::new(config), codec)
    }

    /// Wraps an existing closed store, replacing its replay projection with
    /// the codec's.
    pub fn with_store(store: LogStore, codec: C) -> Self {
        let codec = Arc::new(codec);
        let projector = Arc::clone(&codec);
        let store = store.with_projection(move |raw| {
            projector.decode(raw).ok().map(|value| projector.project(&value))
        });
        Self { store, codec }
    }

    /// Replaces the time source.
    pub fn with_clock(self, clock: impl Clock + 'static) -> Self {
        Self {
            store: self.store.with_clock(clock),
            codec: self.codec,
        }
    }

    /// The underlying raw store.
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// The codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Opens the store and replays its history.
    pub fn open(&self) -> Result<()> {
        self.store.open()
    }

    /// Closes the store.
    pub fn close(&self) -> Result<()> {
        self.store.close()
    }

    /// Returns true while the store is open.
    pub fn is_open(&self) -> bool {
        self.store.is_open()
    }

    /// Writes a new value for `key`.
    pub fn update(&self, key: &str, value: C::Value) -> Result<()> {
        let raw = self.codec.encode(&value)?;
        self.store.update(key, &raw, self.codec.project(&value))
    }

    /// Deletes `key`.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.store.delete(key)
    }

    /// Latest value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`WinStoreError::InvalidValue`](crate::WinStoreError::InvalidValue)
    /// if the stored text does not decode.
    pub fn get(&self, key: &str) -> Result<Option<(Timestamp, C::Value)>> {
        let Some(latest) = self.store.get(key) else {
            return Ok(None);
        };
        match self.codec.decode(&latest.value) {
            Ok(value) => Ok(Some((latest.timestamp, value))),
            Err(e) => {
                warn!("get({:?}): {}", key, e);
                Err(e)
            }
        }
    }

    /// Values of `key` written since `days` days ago, oldest first.
    ///
    /// A delete discards everything collected before it. Values that do not
    /// decode are logged and skipped.
    pub fn history_days(&self, key: &str, days: u32) -> Vec<(Timestamp, C::Value)> {
        let mut values = Vec::new();
        self.store.history_days(key, days, |action, timestamp, raw| match action {
            Action::Delete => values.clear(),
            Action::Update => match self.codec.decode(raw) {
                Ok(value) => values.push((timestamp, value)),
                Err(e) => warn!("history_days({:?}): {}", key, e),
            },
        });
        values
    }

    /// Registers a window on `key`.
    pub fn add_window(&self, key: &str, window: &str, period: Duration) -> Result<()> {
        self.store.add_window(key, window, period)
    }

    /// Registers a threshold on a window of `key` after checking the
    /// breakpoints against the codec's range.
    pub fn add_window_threshold(
        &self,
        key: &str,
        window: &str,
        bounds: ThresholdBounds,
        callback: impl ThresholdNotify + 'static,
    ) -> Result<()> {
        self.codec.check_thresholds(&bounds)?;
        self.store.add_window_threshold(key, window, bounds, callback)
    }

    /// Average of a window of `key`.
    pub fn window_average(&self, key: &str, window: &str) -> Result<f64> {
        self.store.window_average(key, window)
    }

    /// Sample count of a window of `key`.
    pub fn window_count(&self, key: &str, window: &str) -> Result<u64> {
        self.store.window_count(key, window)
    }
}
