use std::{
    fs::File,
    io::{LineWriter, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use eyre::Context;

use super::{LogFormatter, LogSink};
use crate::handlers::ensure_parent_dir;

/// Appends formatted reports to a file, one line each.
pub struct FileSink {
    file: Mutex<LineWriter<File>>,
    file_path: PathBuf,
    formatter: Box<dyn LogFormatter>,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, formatter: Box<dyn LogFormatter>) -> eyre::Result<Self> {
        let file_path: PathBuf = path.into();
        ensure_parent_dir(&file_path)
            .with_context(|| format!("Failed creating directory for {}", file_path.display()))?;

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .with_context(|| {
                format!("Failed opening or creating log file {}", file_path.display())
            })?;

        Ok(Self {
            file: Mutex::new(LineWriter::new(file)),
            file_path,
            formatter,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

impl LogSink for FileSink {
    fn write_log(&self, record: &log::Record) -> eyre::Result<()> {
        let mut file = self.file.lock().map_err(|e| eyre::eyre!(e.to_string()))?;
        writeln!(file, "{}", self.formatter.format(record))?;
        file.flush().context("Can't flush file")
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

pub struct StderrSink {
    handle: std::io::Stderr,
    formatter: Box<dyn LogFormatter>,
}

impl StderrSink {
    pub fn new(formatter: Box<dyn LogFormatter>) -> Self {
        Self {
            handle: std::io::stderr(),
            formatter,
        }
    }
}

impl LogSink for StderrSink {
    fn write_log(&self, record: &log::Record) -> eyre::Result<()> {
        let mut writer = self.handle.lock();

        writeln!(writer, "{}", self.formatter.format(record))?;
        writer.flush().context("Can't flush stderr")
    }

    fn flush(&self) {
        let _ = self.handle.lock().flush();
    }
}

#[derive(Default)]
pub struct NullSink {}

impl NullSink {
    pub fn new() -> Self {
        Self {}
    }
}

impl LogSink for NullSink {
    fn write_log(&self, _record: &log::Record) -> eyre::Result<()> {
        Ok(())
    }

    fn flush(&self) {}
}
