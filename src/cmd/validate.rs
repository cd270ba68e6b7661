//! `gatehouse validate` — check the effective configuration for errors.
//!
//! Loads the given file (or the built-in table), applies the same
//! environment overrides `run` would, and reports results in either
//! human-readable text or machine-readable JSON format.

use crate::cli::{ValidateArgs, ValidateFormat};
use crate::config::{self, env, validation};
use crate::error::GatewayError;

use super::run::resolve_source;

pub async fn execute(args: &ValidateArgs) -> Result<(), GatewayError> {
    let source = resolve_source(args.config.as_deref()).await?;
    let label = args
        .config
        .as_ref()
        .map_or_else(|| source.name().to_string(), |p| p.display().to_string());

    let config = match config::load(source.as_ref(), env::process_env).await {
        Ok((config, _)) => config,
        Err(GatewayError::ConfigValidation { errors }) => {
            match args.format {
                ValidateFormat::Text => {
                    eprintln!("\u{2717} {label} has {} errors\n", errors.len());
                    for error in &errors {
                        eprintln!("{error}");
                    }
                }
                ValidateFormat::Json => {
                    let json_errors: Vec<serde_json::Value> = errors
                        .iter()
                        .map(|e| {
                            serde_json::json!({
                                "scope": e.scope,
                                "field": e.field,
                                "message": e.message,
                                "suggestion": e.suggestion,
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::json!({
                            "valid": false,
                            "errors": json_errors,
                        })
                    );
                }
            }
            return Err(GatewayError::ConfigValidation { errors });
        }
        Err(e) => return Err(e),
    };

    match args.format {
        ValidateFormat::Text => {
            println!(
                "\u{2713} {}",
                validation::format_validation_report(&label, &config)
            );
        }
        ValidateFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "valid": true,
                    "services": config.services.len(),
                    "routes": config.routes.len(),
                })
            );
        }
    }

    Ok(())
}
