use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::commander::{keybinds, KeyBindings};
use crate::domain::Source;
use crate::error::ConfigError;
use crate::repofs::CloneDirectories;

/// Configuration store interface
pub trait ConfigStore: Send + Sync {
    /// Load, expand and validate configuration
    fn load(&self) -> Result<AppConfig>;

    /// Save configuration to storage
    fn save(&self, config: &AppConfig) -> Result<()>;
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Maximum number of sources fetched at once
    pub concurrency: usize,
    /// Shell used to run bound commands
    pub shell: String,
    /// Dotenv files loaded before credentials are resolved
    pub dotenvs: Vec<PathBuf>,
    pub sources: Vec<Source>,
    #[serde(deserialize_with = "keybinds::deserialize_over_defaults")]
    pub key_bindings: KeyBindings,
    pub clone_directories: CloneDirectories,
    pub store: StoreConfig,
    pub logs: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            concurrency: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
            shell: std::env::var("SHELL")
                .ok()
                .filter(|shell| !shell.is_empty())
                .unwrap_or_else(|| "sh".to_string()),
            dotenvs: Vec::new(),
            sources: Vec::new(),
            key_bindings: KeyBindings::defaults(),
            clone_directories: CloneDirectories::default(),
            store: StoreConfig::default(),
            logs: LogConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }

        for source in &self.sources {
            source.validate()?;
        }

        self.key_bindings.validate()?;
        self.clone_directories.validate()
    }
}

/// Local repository store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Relative paths resolve against the configuration file's directory
    pub dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("store"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` takes precedence
    pub level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: LogFormat::Text,
        }
    }
}
