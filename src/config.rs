//! `comptoir.toml` loading.
//!
//! Lookup order: `$COMPTOIR_CONFIG`, then `./comptoir.toml`. A missing file
//! yields defaults; a malformed one is an error. `$COMPTOIR_DB` overrides
//! the database path, `$COMPTOIR_LOG` the log filter.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;

pub const CONFIG_ENV: &str = "COMPTOIR_CONFIG";
pub const DB_ENV: &str = "COMPTOIR_DB";
pub const LOG_ENV: &str = "COMPTOIR_LOG";
pub const LOG_JSON_ENV: &str = "COMPTOIR_LOG_JSON";

const DEFAULT_CONFIG_FILE: &str = "comptoir.toml";
const DEFAULT_DATABASE_FILE: &str = "comptoir.sqlite";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  /// `None` lets the desktop shell pick its app data directory.
  pub database_path: Option<PathBuf>,
  pub backup_dir: PathBuf,
  pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
  pub level: String,
  pub json: bool,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_path: None,
      backup_dir: PathBuf::from("backups"),
      log: LogConfig::default(),
    }
  }
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      level: "info".to_string(),
      json: false,
    }
  }
}

impl Config {
  pub fn parse(text: &str) -> Result<Config> {
    Ok(toml::from_str(text)?)
  }

  pub fn load_from(path: &Path) -> Result<Config> {
    match std::fs::read_to_string(path) {
      Ok(text) => Config::parse(&text),
      Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
      Err(err) => Err(err.into()),
    }
  }

  /// Reads the configuration file then applies environment overrides.
  pub fn load() -> Result<Config> {
    let path = env::var_os(CONFIG_ENV)
      .map(PathBuf::from)
      .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = Config::load_from(&path)?;
    config.apply_env(|key| env::var(key).ok());
    Ok(config)
  }

  fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(path) = lookup(DB_ENV).filter(|value| !value.trim().is_empty()) {
      self.database_path = Some(PathBuf::from(path));
    }
    if let Some(level) = lookup(LOG_ENV).filter(|value| !value.trim().is_empty()) {
      self.log.level = level;
    }
    if let Some(json) = lookup(LOG_JSON_ENV) {
      self.log.json = matches!(json.trim(), "1" | "true" | "yes" | "on");
    }
  }

  /// Database file, falling back to `fallback_dir/comptoir.sqlite` or the
  /// working directory.
  pub fn database_path_or(&self, fallback_dir: Option<&Path>) -> PathBuf {
    match (&self.database_path, fallback_dir) {
      (Some(path), _) => path.clone(),
      (None, Some(dir)) => dir.join(DEFAULT_DATABASE_FILE),
      (None, None) => PathBuf::from(DEFAULT_DATABASE_FILE),
    }
  }
}
