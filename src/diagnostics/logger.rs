use std::path::PathBuf;

use eyre::Context;
use log::{LevelFilter, Log};

use super::{
    formatters::EntryFormatter,
    sinks::{FileSink, NullSink, StderrSink},
    LogSink,
};
use crate::entry::LogLevel;

/// `log` implementation that forwards this crate's enabled records to a
/// single sink. Records from other targets are ignored.
pub struct DiagnosticLogger {
    filter: LevelFilter,
    sink: Box<dyn LogSink>,
}

impl DiagnosticLogger {
    pub fn new(filter: LevelFilter, sink: Box<dyn LogSink>) -> Self {
        Self { filter, sink }
    }

    /// Installs this logger as the process-wide `log` backend. Fails if one is
    /// already installed.
    pub fn init(self) -> eyre::Result<()> {
        log::set_max_level(self.filter);
        log::set_boxed_logger(Box::new(self)).context("Failed registering boxed logger")?;

        Ok(())
    }
}

impl Log for DiagnosticLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.target() == crate::TARGET && self.filter >= metadata.level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            if let Err(err) = self.sink.write_log(record) {
                eprintln!("profil_logger: failed writing diagnostic record: {:#}", err);
            }
        }
    }

    fn flush(&self) {
        self.sink.flush()
    }
}

/// `log` has no critical level, so a critical threshold keeps errors only.
fn level_filter(threshold: LogLevel) -> LevelFilter {
    match threshold {
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Warning => LevelFilter::Warn,
        LogLevel::Error | LogLevel::Critical => LevelFilter::Error,
    }
}

#[derive(Debug, Clone)]
enum Destination {
    Null,
    Stderr,
    File(PathBuf),
}

/// Chooses where reports go and from which level. Silent unless configured.
#[derive(Debug, Clone)]
pub struct Builder {
    filter: LevelFilter,
    destination: Destination,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            filter: LevelFilter::Off,
            destination: Destination::Null,
        }
    }

    pub fn with_level(self, filter: LevelFilter) -> Self {
        Self { filter, ..self }
    }

    /// Same gate as [`Logger::set_threshold`](crate::Logger::set_threshold).
    pub fn with_threshold(self, threshold: LogLevel) -> Self {
        self.with_level(level_filter(threshold))
    }

    pub fn with_file_sink(self, path: impl Into<PathBuf>) -> Self {
        Self {
            destination: Destination::File(path.into()),
            ..self
        }
    }

    pub fn with_stderr_sink(self) -> Self {
        Self {
            destination: Destination::Stderr,
            ..self
        }
    }

    pub fn build(self) -> eyre::Result<DiagnosticLogger> {
        let formatter = Box::new(EntryFormatter::new());
        let sink: Box<dyn LogSink> = match self.destination {
            Destination::Null => Box::new(NullSink::new()),
            Destination::Stderr => Box::new(StderrSink::new(formatter)),
            Destination::File(path) => Box::new(FileSink::new(path, formatter)?),
        };

        Ok(DiagnosticLogger::new(self.filter, sink))
    }
}
