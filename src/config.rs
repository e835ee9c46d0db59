//! Layered configuration: CLI flags, then environment, then a TOML file,
//! then built-in defaults.
//!
//! # Example Configuration
//!
//! ```toml
//! data_dir = "/srv/helpdesk"
//! tickets = "tickets-2016.json"   # relative to data_dir
//! color = false
//! ```
//!
//! Environment variables (a `.env` file is honoured):
//! `HDS_DATA_DIR`, `HDS_USERS`, `HDS_ORGANIZATIONS`, `HDS_TICKETS`, `NO_COLOR`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::loader::DataPaths;

pub const DEFAULT_DATA_DIR: &str = "db";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML: {0}")]
    ParseToml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Contents of the optional config file. Every key may be omitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub data_dir: Option<PathBuf>,
    pub users: Option<PathBuf>,
    pub organizations: Option<PathBuf>,
    pub tickets: Option<PathBuf>,
    pub color: Option<bool>,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub users: Option<PathBuf>,
    pub organizations: Option<PathBuf>,
    pub tickets: Option<PathBuf>,
    pub no_color: bool,
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub paths: DataPaths,
    pub color: bool,
}

impl Config {
    /// Resolve from CLI overrides, the process environment and the config file.
    pub fn resolve(overrides: &Overrides) -> Result<Self, ConfigError> {
        let file = match overrides.config.as_deref() {
            Some(path) => FileConfig::load(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => FileConfig::load(&path)?,
                None => FileConfig::default(),
            },
        };
        Self::from_layers(overrides, &EnvConfig::from_env(), &file)
    }

    /// Merge the three layers; earlier layers win.
    pub fn from_layers(
        overrides: &Overrides,
        env: &EnvConfig,
        file: &FileConfig,
    ) -> Result<Self, ConfigError> {
        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| env.data_dir.clone())
            .or_else(|| file.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        if data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation("data_dir must not be empty".into()));
        }

        let defaults = DataPaths::in_dir(&data_dir);
        let pick = |cli: &Option<PathBuf>,
                    env: &Option<PathBuf>,
                    file: &Option<PathBuf>,
                    default: PathBuf| {
            cli.clone()
                .or_else(|| env.clone())
                .or_else(|| file.clone())
                .map_or(default, |p| data_dir.join(p))
        };

        let paths = DataPaths {
            users: pick(&overrides.users, &env.users, &file.users, defaults.users),
            organizations: pick(
                &overrides.organizations,
                &env.organizations,
                &file.organizations,
                defaults.organizations,
            ),
            tickets: pick(&overrides.tickets, &env.tickets, &file.tickets, defaults.tickets),
        };

        let color = !overrides.no_color && !env.no_color && file.color.unwrap_or(true);
        Ok(Self { paths, color })
    }
}

/// Configuration read from environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub data_dir: Option<PathBuf>,
    pub users: Option<PathBuf>,
    pub organizations: Option<PathBuf>,
    pub tickets: Option<PathBuf>,
    pub no_color: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        let path = |key: &str| {
            dotenvy::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            data_dir: path("HDS_DATA_DIR"),
            users: path("HDS_USERS"),
            organizations: path("HDS_ORGANIZATIONS"),
            tickets: path("HDS_TICKETS"),
            no_color: dotenvy::var("NO_COLOR").is_ok(),
        }
    }
}

/// `<platform config dir>/config.toml`, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "helpdesk-search", "helpdesk-search")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
