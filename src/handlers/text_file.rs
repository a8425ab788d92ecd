use std::{
    fs::{File, OpenOptions},
    io::{BufRead, BufReader, ErrorKind, Write},
    path::{Path, PathBuf},
};

use super::{decode_records, ensure_parent_dir, Handler};
use crate::{
    config::{dated_file, today},
    entry::{LogEntry, LogRecord},
    error::Result,
};

/// Writes one `[<timestamp>] <LEVEL>: <message>` line per entry.
///
/// Messages are written as-is. A message containing a line break comes back
/// truncated at the first break, and the text after it is read as a separate
/// malformed line and skipped. Use another backend for multi-line messages.
#[derive(Debug, Clone)]
pub struct TextHandler {
    path: PathBuf,
}

impl TextHandler {
    /// Uses `<output_dir>/log_<today>.log`.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_path(dated_file(output_dir.as_ref(), today(), "log"))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_parent_dir(&path)?;

        // Touch the file without truncating what is already there.
        open_for_append(&path)?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open_for_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Splits a line into its bracketed timestamp, `LEVEL:` and message parts.
fn parse_line(line: &str) -> Option<LogRecord> {
    let line = line.trim_end_matches(&['\r', '\n'][..]);
    let mut parts = line.splitn(3, ' ');
    let (stamp, level, message) = (parts.next()?, parts.next()?, parts.next()?);

    let date = stamp.strip_prefix('[')?.strip_suffix(']')?;
    let level = level.strip_suffix(':')?;

    Some(LogRecord::new(date, level, message))
}

impl Handler for TextHandler {
    fn name(&self) -> &str {
        "text"
    }

    fn persist(&self, entry: &LogEntry) -> Result<()> {
        let mut file = open_for_append(&self.path)?;
        writeln!(file, "{}", entry)?;
        file.flush()?;

        Ok(())
    }

    fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line) {
                Some(record) => records.push(record),
                None => log::warn!(
                    target: crate::TARGET,
                    "text: skipping malformed line {} in {}",
                    idx + 1,
                    self.path.display()
                ),
            }
        }

        Ok(decode_records(self.name(), records))
    }
}
