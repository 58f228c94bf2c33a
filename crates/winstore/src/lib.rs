//! Alopex WinStore - Embedded Windowed Time Series Store
//!
//! This crate keeps the latest value of each data key, maintains sliding time
//! windows over the numeric samples of selected keys, and persists every write
//! to a date-partitioned append log that is replayed on open.
//!
//! # Components
//!
//! - [`LogStore`]: Durable store with daily log files and replay
//! - [`KeyHistory`]: Per-key sample chain shared by all of the key's windows
//! - [`Window`] / [`Threshold`]: Running averages and state-change notification
//! - [`TypedStore`]: Typed front-end over [`LogStore`] with a [`ValueCodec`]
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_winstore::{LogStore, StoreConfig, ThresholdBounds, ThresholdEvent};
//! use std::time::Duration;
//!
//! let store = LogStore::new(StoreConfig::new("/var/lib/metrics", "cpu"));
//!
//! // Windows and thresholds are registered before open
//! store.add_window("cpu.temp", "5m", Duration::from_secs(300))?;
//! store.add_window_threshold(
//!     "cpu.temp",
//!     "5m",
//!     ThresholdBounds::new(5.0, 10.0, 70.0, 85.0),
//!     |event: &ThresholdEvent<'_>| println!("{}: {} -> {}", event.data_key, event.from, event.to),
//! )?;
//!
//! // Replays every dated log file in the directory
//! store.open()?;
//!
//! store.update("cpu.temp", "72.5", 72.5)?;
//! let avg = store.window_average("cpu.temp", "5m")?;
//! ```

#![deny(missing_docs)]

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod typed;

pub use aggregate::{
    KeyHistory, NodeId, SampleChain, Threshold, ThresholdBounds, ThresholdEvent, ThresholdNotify,
    ThresholdState, Window,
};
pub use clock::{Clock, StepClock, SystemClock, Timestamp};
pub use config::{StoreConfig, SyncMode};
pub use error::{Result, WinStoreError};
pub use log::{Action, DataFileLayout, LatestValue, LogRecord, LogStore, RecordError};
pub use typed::{TypedStore, ValueCodec};
