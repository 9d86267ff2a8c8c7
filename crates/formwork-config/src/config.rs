use serde::{Deserialize, Serialize};

use crate::components::{
    DataSourceConfig, LoggingConfig, PresenceConfig, RegistryConfig, RenderConfig, UndoConfig,
};
use crate::loader::{ConfigError, ConfigResult};

/// Top-level Formwork configuration
///
/// Every section falls back to its defaults, so an empty file is a valid
/// configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FormworkConfig {
    /// Logging setup for binaries
    pub logging: LoggingConfig,
    /// Schema renderer limits and locale
    pub render: RenderConfig,
    /// Undo history bounds
    pub undo: UndoConfig,
    /// Component registry policy
    pub registry: RegistryConfig,
    /// Realtime presence subscription
    pub presence: PresenceConfig,
    /// Data source adapter wired into the render context
    pub data_source: DataSourceConfig,
}

impl FormworkConfig {
    /// Reject values the runtime cannot operate with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.undo.max_history == 0 {
            return Err(ConfigError::Invalid(
                "undo.max_history must be greater than zero".to_string(),
            ));
        }
        if self.render.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "render.max_depth must be greater than zero".to_string(),
            ));
        }
        if self.registry.default_namespace.is_empty()
            || self.registry.default_namespace.contains(':')
        {
            return Err(ConfigError::Invalid(format!(
                "registry.default_namespace '{}' must be non-empty and contain no ':'",
                self.registry.default_namespace
            )));
        }
        match &self.data_source {
            DataSourceConfig::Http { base_url, .. } if base_url.trim().is_empty() => {
                return Err(ConfigError::Invalid(
                    "data_source.base_url must not be empty".to_string(),
                ));
            }
            DataSourceConfig::Rpc { address } if address.trim().is_empty() => {
                return Err(ConfigError::Invalid(
                    "data_source.address must not be empty".to_string(),
                ));
            }
            _ => {}
        }
        if let Some(endpoint) = &self.presence.endpoint {
            if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
                return Err(ConfigError::Invalid(format!(
                    "presence.endpoint '{}' must be a ws:// or wss:// URL",
                    endpoint
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FormworkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.undo.max_history, 50);
        assert_eq!(config.registry.default_namespace, "default");
        assert!(config.presence.endpoint.is_none());
    }

    #[test]
    fn test_zero_history_rejected() {
        let mut config = FormworkConfig::default();
        config.undo.max_history = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_http_requires_base_url() {
        let config = FormworkConfig {
            data_source: DataSourceConfig::Http {
                base_url: "  ".to_string(),
                timeout_seconds: 5,
                headers: Default::default(),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presence_endpoint_scheme() {
        let mut config = FormworkConfig::default();
        config.presence.endpoint = Some("http://example.com".to_string());
        assert!(config.validate().is_err());

        config.presence.endpoint = Some("wss://example.com/presence".to_string());
        assert!(config.validate().is_ok());
    }
}
