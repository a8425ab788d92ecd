use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};

use super::{decode_records, ensure_parent_dir, is_missing_or_empty, Handler};
use crate::{
    config::{dated_file, today},
    entry::{LogEntry, LogRecord},
    error::{Error, Result},
};

/// Keeps every entry in a single pretty-printed JSON array.
///
/// Each write reads the whole array back, appends, and replaces the file, so
/// two writers sharing the same file can lose each other's entries.
#[derive(Debug, Clone)]
pub struct JsonHandler {
    path: PathBuf,
}

impl JsonHandler {
    /// Uses `<output_dir>/log_<today>.json`.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_path(dated_file(output_dir.as_ref(), today(), "json"))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent_dir(&path)?;

        if is_missing_or_empty(&path) {
            write_values(&path, &[])?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<Value>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str::<Vec<Value>>(&contents).map_err(|err| {
            Error::Corruption(format!("{} is not a JSON array: {}", self.path.display(), err))
        })
    }
}

impl Handler for JsonHandler {
    fn name(&self) -> &str {
        "json"
    }

    fn persist(&self, entry: &LogEntry) -> Result<()> {
        let mut values = match self.load() {
            Ok(values) => values,
            Err(Error::Corruption(reason)) => {
                log::warn!(target: crate::TARGET, "{}, starting a new array", reason);
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        values.push(serde_json::to_value(entry.to_record())?);
        write_values(&self.path, &values)
    }

    fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
        let values = match self.load() {
            Ok(values) => values,
            Err(Error::Corruption(reason)) => {
                log::warn!(target: crate::TARGET, "{}, returning no entries", reason);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let records = values
            .into_iter()
            .enumerate()
            .filter_map(|(idx, value)| match serde_json::from_value::<LogRecord>(value) {
                Ok(record) => Some(record),
                Err(err) => {
                    log::warn!(target: crate::TARGET, "json: skipping element {}: {}", idx, err);
                    None
                }
            });

        Ok(decode_records(self.name(), records))
    }
}

/// Replaces the file with `values`, indented by four spaces.
fn write_values(path: &Path, values: &[Value]) -> Result<()> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    values.serialize(&mut serializer)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, &buf)?;
    fs::rename(&tmp, path)?;

    Ok(())
}
