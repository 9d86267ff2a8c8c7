//! Configuration file loading
//!
//! The format is picked from the file extension: `.toml`, `.yaml`/`.yml` or
//! `.json`. Loaded configurations are validated before they are returned.

use std::path::Path;
use thiserror::Error;

use crate::config::FormworkConfig;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file extension does not map to a known format
    #[error("unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// The content could not be parsed
    #[error("{format} parse error: {message}")]
    Parse {
        /// Format that failed
        format: ConfigFormat,
        /// Parser message
        message: String,
    },

    /// The content parsed but holds unusable values
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Supported configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML
    Toml,
    /// YAML
    Yaml,
    /// JSON
    Json,
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Toml => write!(f, "TOML"),
            Self::Yaml => write!(f, "YAML"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

impl ConfigFormat {
    /// Detect the format from a path's extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnsupportedFormat(if other.is_empty() {
                path.display().to_string()
            } else {
                other.to_string()
            })),
        }
    }
}

/// Loads [`FormworkConfig`] from files or strings
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a configuration file
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<FormworkConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = tokio::fs::read_to_string(path).await?;
        tracing::debug!(path = %path.display(), %format, "loading configuration");
        Self::load_from_str(&content, format)
    }

    /// Load a configuration file synchronously (for non-async contexts)
    pub fn load_from_file_sync(path: impl AsRef<Path>) -> ConfigResult<FormworkConfig> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Parse and validate configuration content
    pub fn load_from_str(content: &str, format: ConfigFormat) -> ConfigResult<FormworkConfig> {
        let config: FormworkConfig = match format {
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                    format,
                    message: e.to_string(),
                })?
            }
            #[cfg(feature = "toml")]
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse {
                format,
                message: e.to_string(),
            })?,
            #[cfg(feature = "yaml")]
            ConfigFormat::Yaml => {
                // An empty YAML document deserializes as null, not as an empty map
                if content.trim().is_empty() {
                    FormworkConfig::default()
                } else {
                    serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                        format,
                        message: e.to_string(),
                    })?
                }
            }
            #[allow(unreachable_patterns)]
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };
        config.validate()?;
        Ok(config)
    }
}
