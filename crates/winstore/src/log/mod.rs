//! Date-partitioned append log and the store built on it.
//!
//! The [`LogStore`] persists every write as one text record, keeps the latest
//! value per key, and feeds numeric samples into each key's [`KeyHistory`].
//!
//! # Architecture
//!
//! ```text
//! update → log append (rotate on new day) → latest value → KeyHistory::add_value
//! open   → list <root>_*.dat → replay every file → append to the newest file
//! ```
//!
//! # Features
//!
//! - **Daily Files**: a new file is started on the first write of each day
//! - **Replay**: on open, every record is re-applied in file and line order so
//!   latest values and window state match what they were before restart
//! - **Corruption Tolerance**: malformed or out-of-sequence records are logged
//!   with file name and line number and skipped
//! - **History Scan**: the records of one key over the last N days can be
//!   streamed without touching live state
//!
//! # Example
//!
//! ```rust,ignore
//! use alopex_winstore::{LogStore, StoreConfig};
//! use std::time::Duration;
//!
//! let store = LogStore::new(StoreConfig::new("/var/lib/metrics", "cpu"));
//! store.add_window("cpu.temp", "1m", Duration::from_secs(60))?;
//! store.open()?;
//!
//! store.update("cpu.temp", "41.5", 41.5)?;
//! let avg = store.window_average("cpu.temp", "1m")?;
//! ```

pub mod layout;
pub mod record;

pub use layout::DataFileLayout;
pub use record::{Action, LogRecord, RecordError};

use crate::aggregate::{KeyHistory, ThresholdBounds, ThresholdNotify};
use crate::clock::{Clock, SystemClock, Timestamp};
use crate::config::{StoreConfig, SyncMode};
use crate::error::{Result, WinStoreError};
use chrono::{Days, NaiveDate};
use record::{FIELD_SEPARATOR, MIN_KEY_LENGTH};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maps a raw stored value to the numeric sample fed into windows on replay.
pub type Projection = Box<dyn Fn(&str) -> Option<f64> + Send + Sync>;

/// The most recent value written for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestValue {
    /// Time of the write.
    pub timestamp: Timestamp,
    /// Raw stored value.
    pub value: String,
}

/// A log file known to the store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct DataFile {
    name: String,
    date: NaiveDate,
}

/// The file currently open for appending.
struct OpenFile {
    writer: BufWriter<File>,
    date: NaiveDate,
}

/// Record counts from scanning one file.
#[derive(Debug, Default, Clone, Copy)]
struct ScanStats {
    accepted: usize,
    skipped: usize,
}

#[derive(Default)]
struct StoreState {
    opened: bool,
    file: Option<OpenFile>,
    files: Vec<DataFile>,
    latest: HashMap<String, LatestValue>,
    histories: HashMap<String, KeyHistory>,
}

impl StoreState {
    /// Applies an update unless it is older than the key's latest value.
    fn apply_update(
        &mut self,
        key: &str,
        timestamp: Timestamp,
        raw: &str,
        sample: Option<f64>,
    ) -> bool {
        if let Some(latest) = self.latest.get(key) {
            if timestamp < latest.timestamp {
                warn!(
                    "Timestamp out of sequence for {:?}: received {} last {}",
                    key,
                    record::format_timestamp(timestamp),
                    record::format_timestamp(latest.timestamp)
                );
                return false;
            }
        }

        self.latest.insert(
            key.to_string(),
            LatestValue {
                timestamp,
                value: raw.to_string(),
            },
        );

        let history = self
            .histories
            .entry(key.to_string())
            .or_insert_with(|| KeyHistory::new(key));
        match sample {
            Some(value) => history.add_value(timestamp, value),
            None => debug!("No numeric sample for {:?} value {:?}", key, raw),
        }
        true
    }

    fn apply_delete(&mut self, key: &str) {
        if let Some(history) = self.histories.get_mut(key) {
            history.reset();
        }
        self.latest.remove(key);
    }

    /// Forgets all replayed data while keeping window definitions.
    fn clear_data(&mut self) {
        self.latest.clear();
        self.files.clear();
        for history in self.histories.values_mut() {
            history.reset();
        }
    }

    fn insert_file(&mut self, file: DataFile) {
        if let Err(pos) = self.files.binary_search(&file) {
            self.files.insert(pos, file);
        }
    }
}

/// Embedded windowed time series store backed by a dated append log.
///
/// All state sits behind one read/write lock. `get`, `history_days`,
/// `window_average` and `window_count` share the read lock; everything else
/// takes the write lock. Threshold callbacks run while the write lock is held
/// and must not call back into the store.
pub struct LogStore {
    config: StoreConfig,
    layout: DataFileLayout,
    clock: Box<dyn Clock>,
    projection: Projection,
    state: RwLock<StoreState>,
}

impl LogStore {
    /// Creates a closed store using the system clock. Replayed values are
    /// projected to window samples by parsing them as `f64`.
    pub fn new(config: StoreConfig) -> Self {
        let layout = DataFileLayout::new(&config.dir, config.filename_root.clone());
        Self {
            config,
            layout,
            clock: Box::new(SystemClock),
            projection: Box::new(|raw| raw.parse::<f64>().ok()),
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Replaces the projection used to turn replayed raw values into samples.
    pub fn with_projection(
        mut self,
        projection: impl Fn(&str) -> Option<f64> + Send + Sync + 'static,
    ) -> Self {
        self.projection = Box::new(projection);
        self
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|err| err.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|err| err.into_inner())
    }

    /// Opens the store.
    ///
    /// Every existing `<root>_<YYYYMMDD>.dat` file in the directory is replayed
    /// in date order and the newest one is reopened for appending. If there is
    /// none, today's file is created.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or the file cannot be
    /// opened, or [`WinStoreError::AlreadyOpen`] if the store is open.
    pub fn open(&self) -> Result<()> {
        let mut state = self.write();
        if state.opened {
            return Err(WinStoreError::AlreadyOpen);
        }

        info!(
            "Opening windowed store {} in directory {}",
            self.layout.root(),
            self.layout.dir().display()
        );

        let files = self.scan_existing_files()?;
        state.clear_data();

        for file in &files {
            self.replay_file(&mut state, file);
        }

        let current = match files.last() {
            Some(file) => {
                info!(
                    "Starting path retrieved as: {}",
                    self.layout.path_of(&file.name).display()
                );
                file.clone()
            }
            None => {
                let date = self.clock.now().date();
                let file = DataFile {
                    name: self.layout.file_name(date),
                    date,
                };
                info!(
                    "Starting path generated as: {}",
                    self.layout.path_of(&file.name).display()
                );
                file
            }
        };

        state.files = files;
        let writer = self.open_file(&current.name)?;
        state.file = Some(OpenFile {
            writer,
            date: current.date,
        });
        state.insert_file(current);
        state.opened = true;
        Ok(())
    }

    /// Lists the log files of this store, sorted by date.
    fn scan_existing_files(&self) -> Result<Vec<DataFile>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(self.layout.dir())? {
            let entry = entry?;
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !self.layout.has_root(&name) {
                continue;
            }
            match self.layout.parse_file_name(&name) {
                Some(date) => files.push(DataFile { name, date }),
                None => warn!("Ignoring file with unexpected name: {}", name),
            }
        }

        files.sort();
        Ok(files)
    }

    fn replay_file(&self, state: &mut StoreState, file: &DataFile) {
        let stats = self.scan_file(file, |record| match record.action {
            Action::Update => {
                let sample = (self.projection)(record.value);
                state.apply_update(record.key, record.timestamp, record.value, sample)
            }
            Action::Delete => {
                state.apply_delete(record.key);
                true
            }
        });

        debug!(
            "Replayed {} records from {} ({} skipped)",
            stats.accepted, file.name, stats.skipped
        );
    }

    /// Parses every line of `file`, handing valid records to `visit`.
    ///
    /// `visit` returns false when it rejects a record. Unreadable files and
    /// malformed lines are logged and skipped.
    fn scan_file(
        &self,
        file: &DataFile,
        mut visit: impl FnMut(LogRecord<'_>) -> bool,
    ) -> ScanStats {
        let path = self.layout.path_of(&file.name);
        let mut stats = ScanStats::default();

        let reader = match File::open(&path) {
            Ok(f) => BufReader::new(f),
            Err(e) => {
                warn!("Failed to open log file {}: {:?}", path.display(), e);
                return stats;
            }
        };

        for (index, line) in reader.split(b'\n').enumerate() {
            let line_num = index + 1;
            let bytes = match line {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to read {}:{}: {:?}", path.display(), line_num, e);
                    break;
                }
            };
            let Ok(line) = std::str::from_utf8(&bytes) else {
                warn!("Skipping non UTF-8 record: {}:{}", path.display(), line_num);
                stats.skipped += 1;
                continue;
            };

            match LogRecord::parse(line, file.date) {
                Ok(record) => {
                    if visit(record) {
                        stats.accepted += 1;
                    } else {
                        warn!("Skipped record: {}:{} - {:?}", path.display(), line_num, line);
                        stats.skipped += 1;
                    }
                }
                Err(e) => {
                    warn!("{}: {}:{} - {:?}", e, path.display(), line_num, line);
                    stats.skipped += 1;
                }
            }
        }

        stats
    }

    fn open_file(&self, name: &str) -> Result<BufWriter<File>> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.config.file_mode);
        }
        let file = options.open(self.layout.path_of(name))?;
        Ok(BufWriter::new(file))
    }

    /// Switches appending to the file for `date`.
    fn rotate(&self, state: &mut StoreState, date: NaiveDate) -> Result<()> {
        if let Some(mut old) = state.file.take() {
            if let Err(e) = old.writer.flush() {
                warn!("Failed to flush log file before rotation: {:?}", e);
            }
        }

        let file = DataFile {
            name: self.layout.file_name(date),
            date,
        };
        let writer = self.open_file(&file.name)?;
        info!(
            "Rotated to new log file: {}",
            self.layout.path_of(&file.name).display()
        );

        state.file = Some(OpenFile { writer, date });
        state.insert_file(file);
        Ok(())
    }

    /// Appends one record, rotating first if the record belongs to a new day.
    fn append(&self, state: &mut StoreState, record: &LogRecord<'_>) -> Result<()> {
        let date = record.timestamp.date();
        if state.file.as_ref().map(|f| f.date) != Some(date) {
            self.rotate(state, date)?;
        }

        let file = state.file.as_mut().ok_or(WinStoreError::NotOpen)?;
        record.write_to(&mut file.writer)?;
        file.writer.flush()?;

        match self.config.sync_mode {
            SyncMode::Fsync => file.writer.get_ref().sync_all()?,
            SyncMode::Fdatasync => file.writer.get_ref().sync_data()?,
            SyncMode::None => {}
        }
        Ok(())
    }

    /// Writes a new value for `key`.
    ///
    /// If the log write fails the error is returned, but the in-memory latest
    /// value and windows are still updated. A write timed before the key's
    /// latest value (a clock set back, or the repeated hour when daylight
    /// saving ends) is still appended to the log, but memory keeps the newer
    /// value, the same outcome replay produces.
    ///
    /// # Errors
    ///
    /// Returns [`WinStoreError::InvalidDataKey`] or
    /// [`WinStoreError::InvalidValue`] for bad input,
    /// [`WinStoreError::NotOpen`] if the store is closed,
    /// [`WinStoreError::OutOfSequence`] if the value was logged but not
    /// applied, or the I/O error of the write.
    pub fn update(&self, key: &str, raw: &str, value: f64) -> Result<()> {
        validate_key(key)?;
        validate_value(raw)?;

        let mut state = self.write();
        if !state.opened {
            return Err(WinStoreError::NotOpen);
        }

        let timestamp = self.clock.now();
        let written = self.append(&mut state, &LogRecord::update(timestamp, key, raw));
        if let Err(e) = &written {
            warn!("update(key={:?},value={:?}) failed: {}", key, raw, e);
        }

        let applied = state.apply_update(key, timestamp, raw, Some(value));
        written?;
        if !applied {
            return Err(WinStoreError::OutOfSequence(key.to_string()));
        }
        Ok(())
    }

    /// Removes `key`: resets its windows, drops its latest value and appends a
    /// tombstone record.
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;

        let mut state = self.write();
        if !state.opened {
            return Err(WinStoreError::NotOpen);
        }

        state.apply_delete(key);
        let timestamp = self.clock.now();
        let written = self.append(&mut state, &LogRecord::delete(timestamp, key));
        if let Err(e) = &written {
            warn!("delete(key={:?}) failed: {}", key, e);
        }
        written
    }

    /// Returns the latest value of `key`, or `None` if it was never written or
    /// has been deleted.
    pub fn get(&self, key: &str) -> Option<LatestValue> {
        let state = self.read();
        let latest = state.latest.get(key).cloned();
        if latest.is_none() {
            warn!("get({:?}): {}", key, WinStoreError::UnknownDataKey(key.to_string()));
        }
        latest
    }

    /// Streams every record of `key` written since `days` days ago (`0` means
    /// today only) to `sink`, in file and line order.
    ///
    /// Records older than one already delivered are logged and skipped. Live
    /// state is neither consulted nor changed. `sink` runs under the read lock
    /// and must not call back into the store.
    pub fn history_days(
        &self,
        key: &str,
        days: u32,
        mut sink: impl FnMut(Action, Timestamp, &str),
    ) {
        let state = self.read();
        let cutoff = self
            .clock
            .now()
            .date()
            .checked_sub_days(Days::new(days.into()))
            .unwrap_or(NaiveDate::MIN);
        let lower_bound = self.layout.lower_bound(cutoff);

        let mut last: Option<Timestamp> = None;
        for file in state.files.iter().filter(|f| f.name >= lower_bound) {
            self.scan_file(file, |record| {
                if record.key != key {
                    return true;
                }
                if last.is_some_and(|last| record.timestamp < last) {
                    return false;
                }
                sink(record.action, record.timestamp, record.value);
                last = Some(record.timestamp);
                true
            });
        }
    }

    /// Closes the open log file. Closing a closed store does nothing.
    pub fn close(&self) -> Result<()> {
        let mut state = self.write();
        state.opened = false;

        if let Some(mut file) = state.file.take() {
            file.writer.flush()?;
            match self.config.sync_mode {
                SyncMode::Fsync => file.writer.get_ref().sync_all()?,
                SyncMode::Fdatasync => file.writer.get_ref().sync_data()?,
                SyncMode::None => {}
            }
            debug!("Closed log file dated {}", record::format_date(file.date));
        }
        Ok(())
    }

    /// Registers a window on `key`. Only allowed before the store is opened.
    pub fn add_window(&self, key: &str, window: &str, period: Duration) -> Result<()> {
        validate_key(key)?;

        let mut state = self.write();
        if state.opened {
            return Err(WinStoreError::WindowAfterOpen);
        }

        state
            .histories
            .entry(key.to_string())
            .or_insert_with(|| KeyHistory::new(key))
            .add_window(window, period)
    }

    /// Registers a threshold on a window of `key`. Only allowed before the
    /// store is opened.
    pub fn add_window_threshold(
        &self,
        key: &str,
        window: &str,
        bounds: ThresholdBounds,
        callback: impl ThresholdNotify + 'static,
    ) -> Result<()> {
        let mut state = self.write();
        if state.opened {
            return Err(WinStoreError::ThresholdAfterOpen);
        }

        state
            .histories
            .get_mut(key)
            .ok_or_else(|| WinStoreError::UnknownDataKey(key.to_string()))?
            .add_threshold(window, bounds, Box::new(callback))
    }

    /// Average of a window of `key`.
    pub fn window_average(&self, key: &str, window: &str) -> Result<f64> {
        let state = self.read();
        state
            .histories
            .get(key)
            .ok_or_else(|| WinStoreError::UnknownDataKey(key.to_string()))?
            .average(window)
    }

    /// Sample count of a window of `key`.
    pub fn window_count(&self, key: &str, window: &str) -> Result<u64> {
        let state = self.read();
        state
            .histories
            .get(key)
            .ok_or_else(|| WinStoreError::UnknownDataKey(key.to_string()))?
            .count(window)
    }

    /// Returns true between a successful `open` and `close`.
    pub fn is_open(&self) -> bool {
        self.read().opened
    }

    /// Names of the known log files, oldest first.
    pub fn history_files(&self) -> Vec<String> {
        self.read().files.iter().map(|f| f.name.clone()).collect()
    }
}

impl Drop for LogStore {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|err| err.into_inner());
        if let Some(file) = state.file.as_mut() {
            if let Err(e) = file.writer.flush() {
                warn!("Failed to flush log file on drop: {:?}", e);
            }
        }
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.len() < MIN_KEY_LENGTH || key.contains(FIELD_SEPARATOR) || key.contains(['\n', '\r']) {
        warn!("Invalid data key: {:?}", key);
        return Err(WinStoreError::InvalidDataKey(key.to_string()));
    }
    Ok(())
}

fn validate_value(raw: &str) -> Result<()> {
    if raw.contains(['\n', '\r']) {
        return Err(WinStoreError::InvalidValue(format!(
            "line break in value {:?}",
            raw
        )));
    }
    Ok(())
}
