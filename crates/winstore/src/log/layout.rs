//! Dated log file naming.
//!
//! Each calendar day of writes gets its own file, `<root>_<YYYYMMDD>.dat`.
//! Because the date is zero-padded, lexical order of names equals
//! chronological order.

use crate::log::record::{format_date, parse_date};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Extension of log files.
pub const FILE_EXTENSION: &str = "dat";

/// Naming scheme for the log files of one store.
///
/// # Examples
/// ```rust,ignore
/// use alopex_winstore::log::layout::DataFileLayout;
///
/// let layout = DataFileLayout::new("/var/lib/metrics", "cpu");
/// let name = layout.file_name(date); // "cpu_20000515.dat"
/// assert_eq!(layout.parse_file_name(&name), Some(date));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileLayout {
    dir: PathBuf,
    root: String,
}

impl DataFileLayout {
    /// Creates a layout for `root` files inside `dir`.
    pub fn new(dir: impl AsRef<Path>, root: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            root: root.into(),
        }
    }

    /// Directory holding the files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File name root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Builds the file name for `date`.
    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}_{}.{}", self.root, format_date(date), FILE_EXTENSION)
    }

    /// Full path of the file for `date`.
    pub fn file_path(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(self.file_name(date))
    }

    /// Full path of a file name listed in the directory.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Returns true if `name` starts with the file root.
    pub fn has_root(&self, name: &str) -> bool {
        name.starts_with(&self.root)
    }

    /// Parses the date out of a file name produced by [`Self::file_name`].
    pub fn parse_file_name(&self, name: &str) -> Option<NaiveDate> {
        let rest = name.strip_prefix(&self.root)?.strip_prefix('_')?;
        let date = rest.strip_suffix(FILE_EXTENSION)?.strip_suffix('.')?;
        parse_date(date)
    }

    /// Smallest file name holding records on or after `date`.
    ///
    /// The bound has no extension, so it sorts just before that day's file.
    pub fn lower_bound(&self, date: NaiveDate) -> String {
        format!("{}_{}", self.root, format_date(date))
    }
}
