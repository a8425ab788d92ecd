use std::{
    future::Future,
    path::{Path, PathBuf},
    thread,
};

use sqlx::{sqlite::SqliteConnectOptions, Connection, SqliteConnection};
use tokio::runtime::Handle;

use super::{decode_records, ensure_parent_dir, Handler};
use crate::{
    entry::{format_timestamp, LogEntry, LogRecord},
    error::{Error, Result},
};

type Row = (Option<String>, Option<String>, Option<String>);

/// Tables a [`SqliteHandler`] may write to. The table name ends up inside the
/// SQL text, so it is only ever taken from this list.
pub const TABLE_NAME_ALLOW_LIST: [&str; 4] = ["logs", "other_logs", "debug_logs", "app_events"];

/// Stores entries as rows of `(id, timestamp, level, message)`.
///
/// The API is blocking: every call drives a short-lived current-thread runtime
/// and opens its own connection, closing it before returning. When the caller
/// is already inside a tokio runtime the work moves to a scoped thread, so the
/// handler can be used from async code too (it blocks the calling task).
#[derive(Debug, Clone)]
pub struct SqliteHandler {
    db_path: PathBuf,
    table_name: &'static str,
}

impl SqliteHandler {
    pub fn new(db_path: impl Into<PathBuf>, table_name: &str) -> Result<Self> {
        let table_name = TABLE_NAME_ALLOW_LIST
            .iter()
            .copied()
            .find(|allowed| *allowed == table_name)
            .ok_or_else(|| {
                Error::Config(format!(
                    "table name '{}' is not allowed, expected one of {:?}",
                    table_name, TABLE_NAME_ALLOW_LIST
                ))
            })?;

        let db_path = db_path.into();
        ensure_parent_dir(&db_path)?;

        let handler = Self {
            db_path,
            table_name,
        };
        handler.create_table()?;

        log::debug!(
            target: crate::TARGET,
            "sqlite: using table {} in {}",
            handler.table_name,
            handler.db_path.display()
        );
        Ok(handler)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn table_name(&self) -> &str {
        self.table_name
    }

    /// Drives `op` to completion on a fresh runtime. A runtime can't be
    /// started on a thread that already runs one, hence the scoped thread.
    fn run<T: Send>(&self, op: impl Future<Output = Result<T>> + Send) -> Result<T> {
        let block_on = move || -> Result<T> {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(op)
        };

        if Handle::try_current().is_err() {
            return block_on();
        }

        thread::scope(|scope| {
            scope.spawn(block_on).join().unwrap_or_else(|_| {
                Err(Error::Io(std::io::Error::other(
                    "sqlite worker thread panicked",
                )))
            })
        })
    }

    async fn connect(&self) -> Result<SqliteConnection> {
        let opts = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .create_if_missing(true);

        Ok(SqliteConnection::connect_with(&opts).await?)
    }

    fn create_table(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                level     TEXT NOT NULL,
                message   TEXT NOT NULL
            )",
            self.table_name
        );

        self.run(async {
            let mut conn = self.connect().await?;
            let result = sqlx::query(&sql).execute(&mut conn).await;
            conn.close().await?;
            result?;

            Ok::<_, Error>(())
        })
    }
}

impl Handler for SqliteHandler {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn persist(&self, entry: &LogEntry) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (timestamp, level, message) VALUES (?1, ?2, ?3)",
            self.table_name
        );

        self.run(async {
            let mut conn = self.connect().await?;
            let result = sqlx::query(&sql)
                .bind(format_timestamp(&entry.timestamp))
                .bind(entry.level.as_str())
                .bind(entry.message.as_str())
                .execute(&mut conn)
                .await;
            conn.close().await?;
            result?;

            Ok::<_, Error>(())
        })
    }

    fn retrieve_all(&self) -> Result<Vec<LogEntry>> {
        let sql = format!(
            "SELECT timestamp, level, message FROM {} ORDER BY timestamp ASC",
            self.table_name
        );

        let rows: Vec<Row> = self.run(async {
            let mut conn = self.connect().await?;
            let result = sqlx::query_as::<_, Row>(&sql).fetch_all(&mut conn).await;
            conn.close().await?;

            Ok::<_, Error>(result?)
        })?;

        let records = rows.into_iter().map(|(date, level, message)| LogRecord {
            date,
            level,
            message,
        });

        Ok(decode_records(self.name(), records))
    }
}
