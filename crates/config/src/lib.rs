//! Layered configuration for flibook.
//!
//! Values are merged, lowest priority first, from:
//! 1. built-in defaults,
//! 2. a config file (an explicit path, or `config.toml` in the platform config
//!    directory when it exists),
//! 3. environment variables prefixed `FLIBOOK_`, with nested keys separated by
//!    `__` (`FLIBOOK_IMPORT__BATCH_SIZE=500`).
//!
//! Command-line flags are applied by the caller on top of the result.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APPLICATION: &str = "flibook";
const ENV_PREFIX: &str = "FLIBOOK_";
const CONFIG_FILE: &str = "config.toml";
const DATABASE_FILE: &str = "flibook.db";
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// What the importer does when a batch fails to persist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFailurePolicy {
    /// Stop importing and report the failed batch.
    #[default]
    Halt,
    /// Record the failed batch and carry on with the next one.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Maximum number of records committed in one transaction.
    pub batch_size: usize,
    pub on_batch_failure: BatchFailurePolicy,
}
impl Default for ImportConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, on_batch_failure: BatchFailurePolicy::default() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path of the SQLite catalog database.
    pub database: PathBuf,
    /// Directory holding the dump's book, cover and image archives.
    pub dump_root: Option<PathBuf>,
    pub import: ImportConfig,
}
impl Default for Config {
    fn default() -> Self {
        Self { database: default_database_path(), dump_root: None, import: ImportConfig::default() }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", APPLICATION)
}

fn default_database_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join(DATABASE_FILE),
        None => PathBuf::from(DATABASE_FILE),
    }
}

/// Location of the config file read when no explicit path is given.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

fn file_provider(figment: Figment, path: &Path) -> Result<Figment> {
    if !path.is_file() {
        exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
    }
    let extension = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
        Some("json") => figment.merge(Json::file(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.to_path_buf())),
    })
}

impl Config {
    /// Build the layered figment, without extracting it.
    ///
    /// An explicit `path` must exist; the default config file is optional.
    pub fn figment(path: Option<&Path>) -> Result<Figment> {
        let figment = Figment::from(Serialized::defaults(Config::default()));
        let figment = match (path, default_config_path()) {
            (Some(path), _) => file_provider(figment, path)?,
            (None, Some(default)) if default.is_file() => file_provider(figment, &default)?,
            (None, _) => figment,
        };
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Extract and validate a configuration.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Self = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration from every layer.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = Self::from_figment(&Self::figment(path)?)?;
        tracing::debug!(?config, "loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.import.batch_size == 0 {
            exn::bail!(ErrorKind::Invalid("import.batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
