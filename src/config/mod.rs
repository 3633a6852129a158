// Required external crates for configuration management and serialization
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use config::{Config, ConfigError, Environment, File};

/// Configuration for reaching the prediction backend
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Base URL every endpoint path is joined onto
    pub base_url: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
    /// Connection establishment timeout in seconds
    pub connect_timeout_secs: u64,
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Configuration for the upload forms
#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    /// Raster layer keys offered by the TIFF type selection
    pub tiff_types: Vec<String>,
}

/// Prediction form field carrying the selected model; extra fields may not reuse it
pub const MODEL_FIELD: &str = "model_filename";

/// One extra free-text field sent with every prediction request
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// Parses `name=value`, as given on the command line.
impl FromStr for FormField {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.split_once('=') {
            Some((name, _)) if name == MODEL_FIELD => {
                Err(format!("'{}' is reserved for the selected model", MODEL_FIELD))
            }
            Some((name, value)) if !name.is_empty() => Ok(FormField {
                name: name.to_string(),
                value: value.to_string(),
            }),
            _ => Err(format!("expected name=value, got '{}'", raw)),
        }
    }
}

/// Configuration for the prediction form
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PredictConfig {
    /// Fields appended after `model_filename`, in order
    #[serde(default)]
    pub extra_fields: Vec<FormField>,
}

/// Configuration for application logging
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (debug, info, warn, error)
    pub level: String,
    /// Optional log directory
    pub file: Option<PathBuf>,
}

/// Main settings struct that contains all configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Backend connection settings
    pub server: ServerConfig,
    /// Upload form settings
    pub upload: UploadConfig,
    /// Prediction form settings
    #[serde(default)]
    pub predict: PredictConfig,
    /// Logging-related settings
    pub logging: LoggingConfig,
}

/// Implementation for loading and parsing configuration
impl Settings {
    /// Creates a new Settings instance from the `config` directory under the
    /// current working directory. See [`Settings::load`] for precedence.
    pub fn new() -> Result<Self, ConfigError> {
        let config_dir = std::env::current_dir()
            .map_err(|e| ConfigError::Message(
                format!("Failed to get current directory: {}", e)
            ))?
            .join("config");

        Self::load(&config_dir)
    }

    /// Loads settings from `config_dir` in the following order of precedence
    /// (highest to lowest):
    /// 1. Environment variables prefixed with RASTERPREDICT_ (`__` nests, e.g.
    ///    `RASTERPREDICT_SERVER__BASE_URL`)
    /// 2. Local config file (local.toml) if present
    /// 3. Default config file (default.toml)
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        if !config_dir.exists() {
            return Err(ConfigError::Message(
                format!("Config directory not found at: {}", config_dir.display())
            ));
        }

        let default_config = config_dir.join("default.toml");
        if !default_config.exists() {
            return Err(ConfigError::Message(
                format!("Default configuration file not found at: {}", default_config.display())
            ));
        }

        let local_config = config_dir.join("local.toml");

        // Convert paths to strings and keep them alive
        let default_config_path = default_config.to_string_lossy();
        let local_config_path = local_config.to_string_lossy();

        let settings = Config::builder()
            .add_source(File::with_name(&default_config_path))
            .add_source(File::with_name(&local_config_path).required(false))
            .add_source(
                Environment::with_prefix("RASTERPREDICT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize::<Settings>()?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration values. Run again after settings are changed
    /// in code, e.g. by command-line overrides.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match reqwest::Url::parse(&self.server.base_url) {
            Ok(url) if url.cannot_be_a_base() => {
                return Err(ConfigError::Message(
                    format!("base_url cannot be used as a base: {}", self.server.base_url)
                ));
            }
            Ok(_) => {}
            Err(e) => {
                return Err(ConfigError::Message(
                    format!("Invalid base_url '{}': {}", self.server.base_url, e)
                ));
            }
        }

        if self.server.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "timeout_secs must be greater than 0".to_string()
            ));
        }

        if self.server.connect_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "connect_timeout_secs must be greater than 0".to_string()
            ));
        }

        if self.upload.tiff_types.is_empty() {
            return Err(ConfigError::Message(
                "upload.tiff_types must list at least one raster type".to_string()
            ));
        }

        if let Some(field) = self.predict.extra_fields.iter().find(|f| f.name == MODEL_FIELD) {
            return Err(ConfigError::Message(
                format!("predict.extra_fields may not redefine '{}'", field.name)
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => Ok(()),
            _ => Err(ConfigError::Message(
                format!("Invalid logging level: {}. Must be one of: error, warn, info, debug, trace",
                    self.logging.level)
            )),
        }?;

        // Create log directory if configured and doesn't exist
        if let Some(log_dir) = &self.logging.file {
            if !log_dir.exists() {
                std::fs::create_dir_all(log_dir).map_err(|e| {
                    ConfigError::Message(format!(
                        "Failed to create log directory at {}: {}",
                        log_dir.display(), e
                    ))
                })?;
            }
        }

        Ok(())
    }
}
