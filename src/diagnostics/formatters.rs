use chrono::Local;

use super::LogFormatter;
use crate::entry::{LogEntry, LogLevel};

/// Renders a report exactly like a stored text-file entry, so a diagnostics
/// file can be read back with [`TextHandler`](crate::TextHandler).
#[derive(Debug, Default, Clone, Copy)]
pub struct EntryFormatter;

impl EntryFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl LogFormatter for EntryFormatter {
    fn format(&self, record: &log::Record) -> String {
        let level = LogLevel::from(record.level());
        LogEntry::new(Local::now().naive_local(), level, record.args().to_string()).to_string()
    }
}
