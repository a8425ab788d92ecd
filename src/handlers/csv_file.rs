use std::{
    fs::OpenOptions,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use super::{decode_records, ensure_parent_dir, is_missing_or_empty, Handler};
use crate::{
    config::{dated_file, today},
    entry::{format_timestamp, LogEntry, LogRecord},
    error::{Error, Result},
};

const HEADER: [&str; 3] = ["date", "level", "message"];

/// Appends one row per entry under a `date,level,message` header.
#[derive(Debug, Clone)]
pub struct CsvHandler {
    path: PathBuf,
}

impl CsvHandler {
    /// Uses `<output_dir>/log_<today>.csv`.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_path(dated_file(output_dir.as_ref(), today(), "csv"))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent_dir(&path)?;

        let handler = Self { path };
        if is_missing_or_empty(&handler.path) {
            handler.append(None)?;
        }

        Ok(handler)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens the file in append mode, writing the header first when the file is
    /// new, then the optional row.
    fn append(&self, row: Option<[&str; 3]>) -> Result<()> {
        let write_header = is_missing_or_empty(&self.path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        if write_header {
            writer.write_record(HEADER)?;
        }
        if let Some(row) = row {
            writer.write_record(row)?;
        }
        writer.flush()?;

        Ok(())
    }

    fn read_records(&self) -> Result<Vec<LogRecord>> {
        let mut reader = ReaderBuilder::new().from_path(&self.path)?;
        let headers = reader.headers()?.clone();

        let column = |name: &str| headers.iter().position(|header| header == name);
        let (date, level, message) = match (column("date"), column("level"), column("message")) {
            (Some(date), Some(level), Some(message)) => (date, level, message),
            _ => {
                return Err(Error::Corruption(format!(
                    "{} has header {:?}, expected {:?}",
                    self.path.display(),
                    headers,
                    HEADER
                )))
            }
        };

        let field = |row: &StringRecord, idx: usize| row.get(idx).map(str::to_string);

        reader
            .records()
            .map(|row| -> Result<LogRecord> {
                let row = row?;
                Ok(LogRecord {
                    date: field(&row, date),
                    level: field(&row, level),
                    message: field(&row, message),
                })
            })
            .collect()
    }
}

impl Handler for CsvHandler {
    fn name(&self) -> &str {
        "csv"
    }

    fn persist(&self, entry: &LogEntry) -> Result<()> {
        let date = format_timestamp(&entry.timestamp);
        self.append(Some([
            date.as_str(),
            entry.level.as_str(),
            entry.message.as_str(),
        ]))
    }

    fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
        if is_missing_or_empty(&self.path) {
            return Ok(Vec::new());
        }

        match self.read_records() {
            Ok(records) => Ok(decode_records(self.name(), records)),
            Err(Error::Csv(err)) if is_not_found(&err) => Ok(Vec::new()),
            Err(err @ (Error::Csv(_) | Error::Corruption(_))) => {
                log::warn!(
                    target: crate::TARGET,
                    "csv: can't parse {}, returning no entries: {}",
                    self.path.display(),
                    err
                );
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

fn is_not_found(err: &csv::Error) -> bool {
    matches!(err.kind(), csv::ErrorKind::Io(io) if io.kind() == ErrorKind::NotFound)
}
