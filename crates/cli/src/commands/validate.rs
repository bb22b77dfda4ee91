//! Validate command: check a configuration file without running

use anyhow::Result;
use config_loader::ConfigLoader;
use serde::Serialize;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Debug, Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

/// Configuration summary for valid configs
#[derive(Debug, Serialize)]
struct ConfigSummary {
    batch_size: usize,
    batch_delay_secs: u64,
    per_send_delay_ms: u64,
    cache_capacity: usize,
    max_warnings: u32,
    admin_count: usize,
}

/// Execute the validate command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    let result = validate_config(args);
    let valid = result.valid;

    print_validation_result(&result, args.json)?;

    if valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            summary: Some(ConfigSummary {
                batch_size: config.batch_size,
                batch_delay_secs: config.batch_delay_secs,
                per_send_delay_ms: config.per_send_delay_ms,
                cache_capacity: config.cache_capacity,
                max_warnings: config.max_warnings,
                admin_count: config.admin_ids.len(),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            summary: None,
        },
    }
}

fn print_validation_result(result: &ValidationResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);
        if let Some(summary) = &result.summary {
            println!("  batch size:       {}", summary.batch_size);
            println!("  batch delay:      {}s", summary.batch_delay_secs);
            println!("  per-send delay:   {}ms", summary.per_send_delay_ms);
            println!("  cache capacity:   {}", summary.cache_capacity);
            println!("  warning budget:   {}", summary.max_warnings);
            println!("  admins:           {}", summary.admin_count);
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(error) = &result.error {
            println!("  {error}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(path: &std::path::Path) -> ValidateArgs {
        ValidateArgs {
            config: path.to_path_buf(),
            json: false,
        }
    }

    #[test]
    fn test_validate_valid_config() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "batch_size = 25\nmax_warnings = 3").unwrap();

        let result = validate_config(&args_for(file.path()));
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.batch_size, 25);
        assert_eq!(summary.max_warnings, 3);
    }

    #[test]
    fn test_validate_invalid_config() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(file, "batch_size = 0").unwrap();

        let result = validate_config(&args_for(file.path()));
        assert!(!result.valid);
        assert!(result.error.is_some());
        assert!(result.summary.is_none());
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_config(&args_for(std::path::Path::new(
            "/nonexistent/relaycast.toml",
        )));
        assert!(!result.valid);
    }
}
