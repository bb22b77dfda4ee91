//! Configuration validation
//!
//! Rules:
//! - declared `validator` ranges on every tunable
//! - batch delay must cover the per-send delay (pacing sanity)
//! - admin ids unique

use std::collections::HashSet;

use contracts::EngineConfig;
use validator::Validate;

use crate::error::ConfigError;

/// Validate an `EngineConfig`
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    validate_ranges(config)?;
    validate_pacing(config)?;
    validate_admin_ids(config)?;
    Ok(())
}

/// Declared field ranges
fn validate_ranges(config: &EngineConfig) -> Result<(), ConfigError> {
    config.validate().map_err(|errors| {
        let (field, messages) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| (field.to_string(), errs.clone()))
            .unwrap_or_else(|| (String::from("<unknown>"), Vec::new()));
        let message = messages
            .first()
            .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "out of range".to_string());
        ConfigError::validation(field, message)
    })
}

/// Inter-batch delay must not be shorter than a single send's pacing,
/// otherwise batching provides no throttling at all
fn validate_pacing(config: &EngineConfig) -> Result<(), ConfigError> {
    if config.batch_delay_secs * 1000 < config.per_send_delay_ms {
        return Err(ConfigError::validation(
            "batch_delay_secs",
            format!(
                "batch delay ({}s) must cover the per-send delay ({}ms)",
                config.batch_delay_secs, config.per_send_delay_ms
            ),
        ));
    }
    Ok(())
}

/// Admin id uniqueness
fn validate_admin_ids(config: &EngineConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for id in &config.admin_ids {
        if !seen.insert(id) {
            return Err(ConfigError::validation(
                format!("admin_ids[{id}]"),
                "duplicate admin id",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_pass() {
        assert!(validate(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = EngineConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation { field, .. }) if field == "batch_size"
        ));
    }

    #[test]
    fn test_zero_cache_capacity_rejected() {
        let config = EngineConfig {
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_batch_delay_must_cover_send_delay() {
        let config = EngineConfig {
            batch_delay_secs: 1,
            per_send_delay_ms: 2500,
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("batch_delay_secs"));
    }

    #[test]
    fn test_duplicate_admin_id_rejected() {
        let config = EngineConfig {
            admin_ids: vec![1, 2, 1],
            ..Default::default()
        };
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
