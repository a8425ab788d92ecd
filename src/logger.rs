use std::path::PathBuf;

use crate::{
    config::Config,
    entry::{LogEntry, LogLevel},
    error::Result,
    handlers::{CsvHandler, Handler, JsonHandler, SqliteHandler, TextHandler},
};

/// Accepts leveled messages and fans each one out to every handler.
///
/// Entries below the threshold are dropped before anything is built. A handler
/// that fails to persist is reported through the `log` facade and skipped; the
/// remaining handlers still receive the entry.
pub struct Logger {
    handlers: Vec<Box<dyn Handler>>,
    threshold: LogLevel,
}

impl Logger {
    pub fn new(handlers: Vec<Box<dyn Handler>>) -> Self {
        Self {
            handlers,
            threshold: LogLevel::default(),
        }
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn level(&self) -> LogLevel {
        self.threshold
    }

    /// Accepts any casing of the five level names.
    pub fn set_level(&mut self, level: &str) -> Result<()> {
        self.threshold = level.parse()?;
        Ok(())
    }

    pub fn set_threshold(&mut self, level: LogLevel) {
        self.threshold = level;
    }

    pub fn handlers(&self) -> &[Box<dyn Handler>] {
        &self.handlers
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level.rank() >= self.threshold.rank()
    }

    /// Returns how many handlers stored the entry; 0 when the level is gated.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> usize {
        if !self.enabled(level) {
            return 0;
        }

        let entry = LogEntry::now(level, message);

        let mut persisted = 0;
        for handler in &self.handlers {
            match handler.persist(&entry) {
                Ok(()) => persisted += 1,
                Err(err) => log::error!(
                    target: crate::TARGET,
                    "failed to persist log entry with {} handler: {}",
                    handler.name(),
                    err
                ),
            }
        }

        persisted
    }

    pub fn debug(&self, message: impl Into<String>) -> usize {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: impl Into<String>) -> usize {
        self.log(LogLevel::Info, message)
    }

    pub fn warning(&self, message: impl Into<String>) -> usize {
        self.log(LogLevel::Warning, message)
    }

    pub fn error(&self, message: impl Into<String>) -> usize {
        self.log(LogLevel::Error, message)
    }

    pub fn critical(&self, message: impl Into<String>) -> usize {
        self.log(LogLevel::Critical, message)
    }
}

type HandlerConstructor = Box<dyn FnOnce() -> Result<Box<dyn Handler>>>;

/// Collects handler constructors and builds them, in order, on [`build`](Self::build).
pub struct LoggerBuilder {
    level: LogLevel,
    constructors: Vec<HandlerConstructor>,
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            level: LogLevel::default(),
            constructors: Vec::new(),
        }
    }

    /// Adds all four backends, laid out as described by `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_json_handler(&config.output_dir)
            .with_csv_handler(&config.output_dir)
            .with_text_handler(&config.output_dir)
            .with_sqlite_handler(config.db_path(), config.table_name.clone())
    }

    pub fn with_level(self, level: LogLevel) -> Self {
        Self { level, ..self }
    }

    pub fn with_handler(self, handler: impl Handler + 'static) -> Self {
        self.with_constructor(move || Ok(handler))
    }

    pub fn with_json_handler(self, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir: PathBuf = output_dir.into();
        self.with_constructor(move || JsonHandler::new(output_dir))
    }

    pub fn with_csv_handler(self, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir: PathBuf = output_dir.into();
        self.with_constructor(move || CsvHandler::new(output_dir))
    }

    pub fn with_text_handler(self, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir: PathBuf = output_dir.into();
        self.with_constructor(move || TextHandler::new(output_dir))
    }

    pub fn with_sqlite_handler(
        self,
        db_path: impl Into<PathBuf>,
        table_name: impl Into<String>,
    ) -> Self {
        let db_path: PathBuf = db_path.into();
        let table_name: String = table_name.into();
        self.with_constructor(move || SqliteHandler::new(db_path, &table_name))
    }

    fn with_constructor<H: Handler + 'static>(
        mut self,
        constructor: impl FnOnce() -> Result<H> + 'static,
    ) -> Self {
        self.constructors.push(Box::new(move || {
            let handler = constructor()?;
            Ok(Box::new(handler) as Box<dyn Handler>)
        }));
        self
    }

    /// Fails on the first handler that can't be constructed.
    pub fn build(self) -> Result<Logger> {
        let handlers = self
            .constructors
            .into_iter()
            .map(|constructor| constructor())
            .collect::<Result<Vec<_>>>()?;

        let mut logger = Logger::new(handlers);
        logger.set_threshold(self.level);
        Ok(logger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recording {
        entries: Arc<Mutex<Vec<LogEntry>>>,
    }

    impl Recording {
        fn messages(&self) -> Vec<String> {
            let entries = self.entries.lock().unwrap();
            entries.iter().map(|e| e.message.clone()).collect()
        }
    }

    impl Handler for Recording {
        fn name(&self) -> &str {
            "recording"
        }

        fn persist(&self, entry: &LogEntry) -> Result<()> {
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
            Ok(self.entries.lock().unwrap().clone())
        }
    }

    struct Failing;

    impl Handler for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn persist(&self, _entry: &LogEntry) -> Result<()> {
            Err(Error::Io(std::io::Error::other("disk on fire")))
        }

        fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
            Err(Error::Io(std::io::Error::other("disk on fire")))
        }
    }

    #[test]
    fn test_default_threshold_is_info() {
        let sink = Recording::default();
        let logger = Logger::new(vec![Box::new(sink.clone())]);

        assert_eq!(logger.level(), LogLevel::Info);
        assert_eq!(logger.debug("hidden"), 0);
        assert_eq!(logger.info("shown"), 1);
        assert_eq!(sink.messages(), vec!["shown"]);
    }

    #[test]
    fn test_gate_matches_rank_comparison() {
        for threshold in LogLevel::ALL {
            for level in LogLevel::ALL {
                let sink = Recording::default();
                let mut logger = Logger::new(vec![Box::new(sink.clone())]);
                logger.set_threshold(threshold);

                logger.log(level, "x");
                let written = sink.messages().len();
                assert_eq!(written == 1, level.rank() >= threshold.rank());
            }
        }
    }

    #[test]
    fn test_set_level_is_case_insensitive() {
        let mut logger = Logger::new(Vec::new());
        logger.set_level("debug").unwrap();
        assert_eq!(logger.level(), LogLevel::Debug);

        logger.set_level("Error").unwrap();
        assert_eq!(logger.level(), LogLevel::Error);
    }

    #[test]
    fn test_set_level_rejects_unknown_names() {
        let mut logger = Logger::new(Vec::new());
        logger.set_level("warning").unwrap();

        assert!(matches!(logger.set_level("fatal"), Err(Error::Validation(_))));
        assert_eq!(logger.level(), LogLevel::Warning);
    }

    #[test]
    fn test_debug_threshold_passes_everything() {
        let sink = Recording::default();
        let mut logger = Logger::new(vec![Box::new(sink.clone())]);
        logger.set_level("DEBUG").unwrap();

        logger.debug("d");
        logger.info("i");
        logger.warning("w");
        logger.error("e");
        logger.critical("c");
        assert_eq!(sink.messages(), vec!["d", "i", "w", "e", "c"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_fan_out() {
        let first = Recording::default();
        let last = Recording::default();
        let logger = Logger::new(vec![
            Box::new(first.clone()),
            Box::new(Failing),
            Box::new(last.clone()),
        ]);

        assert_eq!(logger.error("still delivered"), 2);
        assert_eq!(first.messages(), vec!["still delivered"]);
        assert_eq!(last.messages(), vec!["still delivered"]);

        let a = first.entries.lock().unwrap()[0].clone();
        let b = last.entries.lock().unwrap()[0].clone();
        assert_eq!(a, b);
    }

    #[test]
    fn test_builder_keeps_order_and_level() {
        let sink = Recording::default();
        let logger = Logger::builder()
            .with_level(LogLevel::Warning)
            .with_handler(Failing)
            .with_handler(sink.clone())
            .build()
            .unwrap();

        assert_eq!(logger.level(), LogLevel::Warning);
        let names: Vec<&str> = logger.handlers().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["failing", "recording"]);

        logger.info("gated");
        logger.warning("passed");
        assert_eq!(sink.messages(), vec!["passed"]);
    }

    #[test]
    fn test_builder_surfaces_config_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = Logger::builder()
            .with_sqlite_handler(dir.path().join("logs.sqlite3"), "users")
            .build();

        assert!(matches!(result, Err(Error::Config(_))));
    }
}
