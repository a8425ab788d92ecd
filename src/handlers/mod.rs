mod csv_file;
mod json_file;
mod sqlite;
mod text_file;

use std::{fs, path::Path};

pub use self::csv_file::CsvHandler;
pub use self::json_file::JsonHandler;
pub use self::sqlite::{SqliteHandler, TABLE_NAME_ALLOW_LIST};
pub use self::text_file::TextHandler;

use crate::{
    entry::{LogEntry, LogRecord},
    error::Result,
};

/// A storage backend for log entries.
///
/// `persist` may fail with an I/O or database error; the [`Logger`](crate::Logger)
/// reports such failures and carries on with the next handler. `retrieve_all`
/// recovers from corrupted storage by itself, skipping what it can't decode,
/// and only returns an error when the storage can't be read at all.
pub trait Handler: Send + Sync {
    /// Short label used when reporting failures.
    fn name(&self) -> &str;

    fn persist(&self, entry: &LogEntry) -> Result<()>;

    fn retrieve_all(&self) -> Result<Vec<LogEntry>>;
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn persist(&self, entry: &LogEntry) -> Result<()> {
        (**self).persist(entry)
    }

    fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
        (**self).retrieve_all()
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    Ok(())
}

/// True when the file is absent or has no content yet.
pub(crate) fn is_missing_or_empty(path: &Path) -> bool {
    fs::metadata(path).map(|md| md.len() == 0).unwrap_or(true)
}

/// Turns decoded records into entries, dropping (and reporting) the ones that
/// don't validate.
pub(crate) fn decode_records(
    handler: &str,
    records: impl IntoIterator<Item = LogRecord>,
) -> Vec<LogEntry> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match LogEntry::from_record(&record) {
            Ok(entry) => Some(entry),
            Err(err) => {
                log::warn!(target: crate::TARGET, "{}: skipping record {}: {}", handler, idx, err);
                None
            }
        })
        .collect()
}
