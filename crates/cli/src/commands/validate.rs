//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RendererType, TrackerBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    activity_kind: String,
    accuracy_ceiling_m: f64,
    speed_ceiling_mps: f64,
    renderer_count: usize,
    store: Option<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let tracker = blueprint.to_tracker_config();

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    activity_kind: tracker.activity_kind.to_string(),
                    accuracy_ceiling_m: tracker.filter.accuracy_ceiling_m,
                    speed_ceiling_mps: tracker.speed_ceiling(),
                    renderer_count: blueprint.renderers.len(),
                    store: blueprint.store.as_ref().map(|s| format!("{:?}", s.store_type)),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &TrackerBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.renderers.is_empty() {
        warnings.push("No renderers configured - the live path is not drawn".to_string());
    }

    if blueprint.store.is_none() {
        warnings.push("No store configured - activity summaries are not persisted".to_string());
    }

    if blueprint
        .renderers
        .iter()
        .all(|r| r.renderer_type == RendererType::Log)
        && !blueprint.renderers.is_empty()
    {
        warnings.push("Only log renderers configured".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Activity kind: {}", summary.activity_kind);
            println!("  Accuracy ceiling: {} m", summary.accuracy_ceiling_m);
            println!("  Speed ceiling: {} m/s", summary.speed_ceiling_mps);
            println!("  Renderers: {}", summary.renderer_count);
            println!(
                "  Store: {}",
                summary.store.as_deref().unwrap_or("(none)")
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(contents: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let (_file, args) = args_for("[tracker]\nactivity_kind = \"hike\"\n");
        let result = validate_config(&args);

        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.activity_kind, "hike");
        assert_eq!(summary.speed_ceiling_mps, 6.0);
        assert!(result.warnings.unwrap().len() >= 2);
    }

    #[test]
    fn test_invalid_config() {
        let (_file, args) = args_for("[tracker]\nbody_mass_kg = 5.0\n");
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/tracker.toml".into(),
            json: false,
        };
        assert!(!validate_config(&args).valid);
    }
}
