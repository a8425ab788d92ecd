use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDate};
use serde::Deserialize;

use crate::{
    error::{Error, Result},
    handlers::TABLE_NAME_ALLOW_LIST,
};

pub const DEFAULT_TABLE_NAME: &str = "logs";
const DB_FILE_NAME: &str = "logs.sqlite3";

/// Where the backends keep their data. These two settings are the only ones
/// the handlers recognise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(alias = "outputDir")]
    pub output_dir: PathBuf,
    #[serde(alias = "tableName")]
    pub table_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: data_dir(),
            table_name: DEFAULT_TABLE_NAME.to_string(),
        }
    }
}

impl Config {
    pub fn new(output_dir: impl Into<PathBuf>, table_name: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            table_name: table_name.into(),
        }
    }

    /// Reads a TOML file. Keys left out fall back to [`Config::default`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;

        log::debug!(target: crate::TARGET, "loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !TABLE_NAME_ALLOW_LIST.contains(&self.table_name.as_str()) {
            return Err(Error::Config(format!(
                "table name '{}' is not allowed, expected one of {:?}",
                self.table_name, TABLE_NAME_ALLOW_LIST
            )));
        }

        Ok(())
    }

    pub fn json_path(&self) -> PathBuf {
        dated_file(&self.output_dir, today(), "json")
    }

    pub fn csv_path(&self) -> PathBuf {
        dated_file(&self.output_dir, today(), "csv")
    }

    pub fn text_path(&self) -> PathBuf {
        dated_file(&self.output_dir, today(), "log")
    }

    pub fn db_path(&self) -> PathBuf {
        self.output_dir.join(DB_FILE_NAME)
    }
}

pub(crate) fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// `<dir>/log_<YYYY-MM-DD>.<extension>`
pub(crate) fn dated_file(dir: &Path, date: NaiveDate, extension: &str) -> PathBuf {
    dir.join(format!("log_{}.{}", date.format("%Y-%m-%d"), extension))
}

// NOTE: Falls back to the working directory when neither XDG_DATA_HOME nor HOME
// is set, so a library caller never panics just by asking for the defaults.
fn home_dir() -> PathBuf {
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");

    home.map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

pub fn data_dir() -> PathBuf {
    let data_dir = std::env::var("XDG_DATA_HOME")
        .map_or_else(|_| home_dir().join(".local").join("share"), PathBuf::from);

    data_dir.join("profil_logger")
}
