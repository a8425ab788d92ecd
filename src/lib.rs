//! Leveled logging into pluggable storage backends, with a query API over
//! whatever a backend has stored.
//!
//! ```no_run
//! use profil_logger::{JsonHandler, Logger, Reader};
//!
//! # fn main() -> profil_logger::Result<()> {
//! let json = JsonHandler::new("./logs")?;
//! let mut logger = Logger::builder().with_json_handler("./logs").build()?;
//! logger.set_level("debug")?;
//! logger.info("User logged in.");
//!
//! let reader = Reader::new(&json);
//! for entry in reader.find_by_level("info") {
//!     println!("{}", entry);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod entry;
pub mod error;
pub mod handlers;
pub mod logger;
pub mod reader;

pub use config::Config;
pub use entry::{LogEntry, LogLevel, LogRecord};
pub use error::{Error, Result};
pub use handlers::{
    CsvHandler, Handler, JsonHandler, SqliteHandler, TextHandler, TABLE_NAME_ALLOW_LIST,
};
pub use logger::{Logger, LoggerBuilder};
pub use reader::Reader;

/// `log` target for everything this crate reports about itself.
pub const TARGET: &str = "profil_logger";
