//! # Configuration Module
//!
//! This module defines the bot configuration read from the environment
//! (optionally seeded from a `.env` file), including classifier settings,
//! monitoring credentials and the working data directory.

use std::env;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

// Constants for bot configuration
pub const DEFAULT_MODEL: &str = "stage2-50-ep8-ep16";
pub const DEFAULT_ARCH: &str = "resnet101";
pub const DEFAULT_IMAGE_SIZE: u32 = 299;
pub const DEFAULT_ROLLBAR_ENV: &str = "development";
pub const DEFAULT_DATA_PATH: &str = "data/live";
pub const DEFAULT_MODEL_DIR: &str = "models";
pub const DEFAULT_STATS_USERNAME: &str = "xnutsive";

/// Classifier loading configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Architecture identifier, informational only
    pub arch: String,
    /// Checkpoint name, resolved to `<model_dir>/<model>.onnx`
    pub model: String,
    /// Directory holding the checkpoint and `classes.json`
    pub model_dir: PathBuf,
    /// Square input size in pixels
    pub size: u32,
}

impl ClassifierConfig {
    pub fn checkpoint_path(&self) -> PathBuf {
        self.model_dir.join(format!("{}.onnx", self.model))
    }

    pub fn classes_path(&self) -> PathBuf {
        self.model_dir.join("classes.json")
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            arch: DEFAULT_ARCH.to_string(),
            model: DEFAULT_MODEL.to_string(),
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            size: DEFAULT_IMAGE_SIZE,
        }
    }
}

/// Rollbar credentials
#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    /// Access token; reporting only goes to logs when unset
    pub rollbar_token: Option<String>,
    pub rollbar_env: String,
}

impl MonitoringConfig {
    /// Read monitoring settings from the process environment.
    ///
    /// Never fails, so crashes during startup can still be reported.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            rollbar_token: get("rollbar_token"),
            rollbar_env: get("rollbar_env").unwrap_or_else(|| DEFAULT_ROLLBAR_ENV.to_string()),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            rollbar_token: None,
            rollbar_env: DEFAULT_ROLLBAR_ENV.to_string(),
        }
    }
}

/// Complete bot configuration
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token, required to start
    pub bot_token: Option<String>,
    /// Working directory for downloaded pictures and `labels.csv`
    pub data_path: PathBuf,
    /// Only this username gets answers to `/stats`
    pub stats_username: String,
    pub classifier: ClassifierConfig,
    pub monitoring: MonitoringConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            stats_username: DEFAULT_STATS_USERNAME.to_string(),
            classifier: ClassifierConfig::default(),
            monitoring: MonitoringConfig::default(),
        }
    }
}

impl BotConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// Empty values count as unset. Only malformed values fail here; the
    /// startup preconditions are checked by [`BotConfig::validate`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        let size = match get("size") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "size",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_IMAGE_SIZE,
        };

        Ok(Self {
            bot_token: get("bot_token"),
            data_path: get("data_path")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_path),
            stats_username: get("stats_username").unwrap_or(defaults.stats_username),
            classifier: ClassifierConfig {
                arch: get("arch").unwrap_or(defaults.classifier.arch),
                model: get("model").unwrap_or(defaults.classifier.model),
                model_dir: get("model_dir")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.classifier.model_dir),
                size,
            },
            monitoring: MonitoringConfig::from_lookup(&lookup),
        })
    }

    /// Check startup preconditions and return the bot token
    pub fn validate(&self) -> Result<&str, ConfigError> {
        let token = self
            .bot_token
            .as_deref()
            .ok_or(ConfigError::MissingBotToken)?;

        if !Path::new(&self.data_path).is_dir() {
            return Err(ConfigError::DataPathMissing(
                self.data_path.display().to_string(),
            ));
        }

        Ok(token)
    }
}
