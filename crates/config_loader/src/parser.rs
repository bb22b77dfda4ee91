//! Configuration parsing
//!
//! Supports TOML (primary) and JSON (optional) formats.

use contracts::EngineConfig;

use crate::error::ConfigError;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML format (recommended)
    Toml,
    /// JSON format
    Json,
}

impl ConfigFormat {
    /// Infer format from file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<EngineConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<EngineConfig, ConfigError> {
    serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse configuration in the given format
pub fn parse(content: &str, format: ConfigFormat) -> Result<EngineConfig, ConfigError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml_partial_overrides() {
        let content = r#"
batch_size = 25
batch_delay_secs = 10
admin_ids = [100, 200]
"#;
        let config = parse_toml(content).unwrap();
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.batch_delay_secs, 10);
        assert_eq!(config.admin_ids, vec![100, 200]);
        // Unset fields fall back to defaults
        assert_eq!(config.per_send_delay_ms, 2500);
    }

    #[test]
    fn test_parse_json_minimal() {
        let config = parse_json(r#"{ "max_warnings": 3 }"#).unwrap();
        assert_eq!(config.max_warnings, 3);
        assert_eq!(config.cache_capacity, 100);
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
