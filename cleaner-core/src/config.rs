use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "COMMENT_CLEANER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "comment-cleaner.toml";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    /// Seeds the persisted API key when none is stored yet.
    pub api_key: Option<String>,
    pub gemini: GeminiConfig,
    pub pipeline: PipelineConfig,
    pub background: BackgroundConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub debounce_ms: u64,
    pub page_url: String,
    pub snapshot_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub sweep_interval_hours: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub default_filter: String,
    pub verbose_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://comment-cleaner.db".to_string(),
            api_key: None,
            gemini: GeminiConfig::default(),
            pipeline: PipelineConfig::default(),
            background: BackgroundConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            page_url: "https://www.youtube.com/".to_string(),
            snapshot_path: None,
        }
    }
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            sweep_interval_hours: 24,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_filter: "comment_cleaner=info,comment_pipeline=info,warn".to_string(),
            verbose_filter: "comment_cleaner=debug,comment_pipeline=debug,comment_classifier=debug,comment_extractor=debug,database=debug,background_service=debug,info".to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PipelineConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl BackgroundConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_hours * 60 * 60)
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads the file at `path`; a missing file means defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(ConfigError::PermissionDenied {
                    path: path.display().to_string(),
                })
            }
            Err(_) => Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }),
        }
    }

    /// Loads from `COMMENT_CLEANER_CONFIG` (or the default path) and applies env overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Self::load(path)?;
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.api_key = Some(key.trim().to_string());
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.debounce_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.debounce_ms".to_string(),
                value: "0".to_string(),
            });
        }
        if self.background.sweep_interval_hours == 0 {
            return Err(ConfigError::InvalidValue {
                field: "background.sweep_interval_hours".to_string(),
                value: "0".to_string(),
            });
        }
        if self.gemini.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gemini.request_timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.gemini.model.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "gemini.model".to_string(),
                value: self.gemini.model.clone(),
            });
        }
        Ok(())
    }
}
