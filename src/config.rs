//! Configuration file handling for finman.
//!
//! The configuration file is stored at `$FINMAN_HOME/config.json` and holds the settings that
//! shape the dashboard: how many months a window spans and how long a storage call may take.

use crate::db::Db;
use crate::error::{ErrorType, IntoResult, Res};
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const APP_NAME: &str = "finman";
const CONFIG_VERSION: u8 = 1;
const CONFIG_JSON: &str = "config.json";
const FINMAN_SQLITE: &str = "finman.sqlite";
const WINDOW_MONTHS: u32 = 12;
const STORAGE_TIMEOUT_MS: u64 = 5000;

/// The `Config` object represents the configuration of the app. You instantiate it by providing
/// the path to `$FINMAN_HOME` and from there it loads `$FINMAN_HOME/config.json` and opens the
/// database at `$FINMAN_HOME/finman.sqlite`.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
}

impl Config {
    /// Creates the data directory along with:
    /// - an initial `config.json` file holding the default settings
    /// - a new, migrated SQLite database
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of data directory, e.g. `$HOME/finman`
    ///
    /// # Errors
    /// - `Config` if the directory already holds a database or any file operation fails.
    pub async fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        Self::create_inner(dir.into())
            .await
            .pub_result(ErrorType::Config)
    }

    /// This will
    /// - validate that `finman_home` exists and that the config file exists
    /// - load and validate the config file
    /// - open the database, migrating it if needed
    ///
    /// # Errors
    /// - `Config` if any of the above fails.
    pub async fn load(finman_home: impl Into<PathBuf>) -> Result<Self> {
        Self::load_inner(finman_home.into())
            .await
            .pub_result(ErrorType::Config)
    }

    async fn create_inner(maybe_relative: PathBuf) -> Res<Self> {
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the finman home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let config_path = root.join(CONFIG_JSON);
        if config_path.exists() {
            bail!(
                "A config file already exists at '{}'",
                config_path.display()
            );
        }

        let sqlite_path = root.join(FINMAN_SQLITE);
        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;

        let config_file = ConfigFile::default();
        config_file.save(&config_path).await?;
        debug!("Created finman home at {}", root.display());

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    async fn load_inner(maybe_relative: PathBuf) -> Res<Self> {
        let root = utils::canonicalize(&maybe_relative)
            .await
            .context("Finman home is missing")?;
        let _ = utils::read_dir(&root)
            .await
            .context("Finman home is not a directory")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let sqlite_path = root.join(FINMAN_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        Ok(Self {
            root,
            config_path,
            config_file,
            db,
            sqlite_path,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    /// The number of months a dashboard window spans when none is requested.
    pub fn window_months(&self) -> u32 {
        self.config_file.window_months
    }

    /// How long a single storage call may take before it is treated as unavailable.
    pub fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.config_file.storage_timeout_ms)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "finman",
///   "config_version": 1,
///   "window_months": 12,
///   "storage_timeout_ms": 5000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "finman"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// Months in a dashboard window
    #[serde(default = "default_window_months")]
    window_months: u32,

    /// Storage call timeout in milliseconds
    #[serde(default = "default_storage_timeout_ms")]
    storage_timeout_ms: u64,
}

fn default_window_months() -> u32 {
    WINDOW_MONTHS
}

fn default_storage_timeout_ms() -> u64 {
    STORAGE_TIMEOUT_MS
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            window_months: WINDOW_MONTHS,
            storage_timeout_ms: STORAGE_TIMEOUT_MS,
        }
    }
}

impl ConfigFile {
    /// Loads and validates a ConfigFile from `path`.
    async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );
        anyhow::ensure!(
            config.window_months > 0,
            "Invalid window_months in config file: it must be at least 1"
        );
        anyhow::ensure!(
            config.storage_timeout_ms > 0,
            "Invalid storage_timeout_ms in config file: it must be at least 1"
        );

        Ok(config)
    }

    async fn save(&self, path: impl AsRef<Path>) -> Res<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }
}
