//! Where the crate's own reports go.
//!
//! Handler failures, recovered corruption and skipped records are emitted
//! through the `log` facade with [`TARGET`](crate::TARGET). Applications that
//! already install a `log` implementation get them for free; the rest can use
//! [`Builder`] to send them to stderr or a file, one text-file line per report.

mod formatters;
mod logger;
mod sinks;

pub use formatters::EntryFormatter;
pub use logger::{Builder, DiagnosticLogger};
pub use sinks::{FileSink, NullSink, StderrSink};

pub trait LogFormatter: Sync + Send {
    fn format(&self, record: &log::Record) -> String;
}

pub trait LogSink: Sync + Send {
    fn write_log(&self, record: &log::Record) -> eyre::Result<()>;
    fn flush(&self);
}
