//! Error and Result types for windowed store operations.

use std::io;
use thiserror::Error;

/// A convenience `Result` type for store operations.
pub type Result<T> = std::result::Result<T, WinStoreError>;

/// The error type for store operations.
#[derive(Debug, Error)]
pub enum WinStoreError {
    /// Data key is shorter than two bytes or contains the field delimiter.
    #[error("invalid data key: {0:?}")]
    InvalidDataKey(String),

    /// Raw value cannot be stored or decoded.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// No window has ever been registered for the data key.
    #[error("unknown data key: {0:?}")]
    UnknownDataKey(String),

    /// The data key has no window with the given name.
    #[error("unknown window key: {0:?}")]
    UnknownWindowKey(String),

    /// A window with the same name is already registered for the data key.
    #[error("duplicate window key: {0:?}")]
    DuplicateWindowKey(String),

    /// The window has not received any sample since creation or last reset.
    #[error("no window data")]
    NoWindowData,

    /// The write is older than the latest value of its key. It was logged but
    /// not applied in memory.
    #[error("timestamp out of sequence for data key: {0:?}")]
    OutOfSequence(String),

    /// Threshold breakpoints are not ordered.
    #[error(
        "invalid order; need lowCritical <= lowWarning <= highWarning <= highCritical"
    )]
    InvalidThresholdOrder,

    /// Threshold breakpoints fall outside the range accepted by a value codec.
    #[error("invalid threshold bounds: {0}")]
    InvalidThresholdBounds(String),

    /// Windows can only be registered before the store is opened.
    #[error("invalid add window on opened store")]
    WindowAfterOpen,

    /// Thresholds can only be registered before the store is opened.
    #[error("invalid add window threshold on opened store")]
    ThresholdAfterOpen,

    /// The store is already open.
    #[error("store is already open")]
    AlreadyOpen,

    /// The store has not been opened, or has been closed.
    #[error("store is not open")]
    NotOpen,

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
