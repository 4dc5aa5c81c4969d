use std::path::Path;
use std::process;

use petsoft_core::{validate_pet_form, ValidationError};

use crate::{report_error, OutputFormat};

/// Validate a pet form JSON file and print the normalised payload.
pub(crate) fn cmd_validate(file: &Path, output: OutputFormat, quiet: bool) {
    let text = match std::fs::read_to_string(file) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error reading file '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    let raw: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error parsing JSON in '{}': {}", file.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    match validate_pet_form(&raw) {
        Ok(draft) => match output {
            OutputFormat::Text => {
                if !quiet {
                    println!("valid");
                }
                println!(
                    "{}",
                    serde_json::to_string_pretty(&draft).unwrap_or_default()
                );
            }
            OutputFormat::Json => {
                let json = serde_json::json!({ "valid": true, "pet": draft });
                println!("{}", json);
            }
        },
        Err(err) => {
            let errors = error_lines(&err);
            match output {
                OutputFormat::Text => {
                    if !quiet {
                        eprintln!("invalid pet");
                        for e in &errors {
                            eprintln!("  - {}", e);
                        }
                    }
                }
                OutputFormat::Json => {
                    let json = serde_json::json!({ "valid": false, "errors": errors });
                    eprintln!(
                        "{}",
                        serde_json::to_string_pretty(&json).unwrap_or_default()
                    );
                }
            }
            process::exit(1);
        }
    }
}

fn error_lines(err: &ValidationError) -> Vec<String> {
    match err {
        ValidationError::Schema { errors } => errors.clone(),
        other => vec![other.to_string()],
    }
}
