//! WF-009: weft.yaml parsing and validation.
//!
//! Parses weft.yaml and validates structural constraints:
//! - Delimiters must be non-empty
//! - Watch entries must be extensions with a leading '.'
//! - Data keys must be non-empty and free of whitespace
//! - Data keys must not collide with directive keywords when tags coincide
//! - The default layout, if set, must exist

use super::compiler::DIRECTIVE_KEYWORDS;
use super::paths;
use super::types::*;
use std::path::Path;

/// Conventional config file name, looked up in the project directory.
pub const CONFIG_FILE: &str = "weft.yaml";

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a weft.yaml file from disk.
pub fn parse_config_file(path: &Path) -> Result<WeftConfig, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_config(&content)
}

/// Parse a weft.yaml from a string.
pub fn parse_config(yaml: &str) -> Result<WeftConfig, String> {
    serde_yaml_ng::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))
}

/// Load the config at `path`, or defaults when no file exists there.
pub fn load_config(path: &Path) -> Result<WeftConfig, String> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(WeftConfig::default());
    }
    parse_config_file(path)
}

/// Validate a parsed config whose file lives in `config_dir`.
/// Returns a list of errors (empty = valid).
pub fn validate_config(config: &WeftConfig, config_dir: &Path) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    // Delimiters
    for (name, pair) in [("data", &config.tags.data), ("directive", &config.tags.directive)] {
        if pair.iter().any(|t| t.is_empty()) {
            errors.push(ValidationError {
                message: format!("{} tags must not be empty", name),
            });
        }
    }

    // Watch list
    for ext in &config.watch {
        if !ext.starts_with('.') || ext.len() < 2 {
            errors.push(ValidationError {
                message: format!("watch entry '{}' must be an extension like '.html'", ext),
            });
        }
    }

    // Data keys
    let coincide = config.tags.coincide();
    for key in config.data.keys() {
        if key.trim().is_empty() {
            errors.push(ValidationError {
                message: "data key must not be empty".to_string(),
            });
            continue;
        }
        if key.chars().any(char::is_whitespace) {
            errors.push(ValidationError {
                message: format!("data key '{}' must not contain whitespace", key),
            });
        }
        if coincide && DIRECTIVE_KEYWORDS.contains(&key.to_lowercase().as_str()) {
            errors.push(ValidationError {
                message: format!(
                    "data key '{}' is shadowed by the directive of the same name (tags coincide)",
                    key
                ),
            });
        }
    }

    // Default layout
    if let Some(layout) = config.layout.as_deref() {
        if layout.trim().is_empty() {
            errors.push(ValidationError {
                message: "layout must not be empty".to_string(),
            });
        } else {
            let target = paths::resolve_layout(layout, &config.base_dir(config_dir));
            if !target.is_file() {
                errors.push(ValidationError {
                    message: format!("layout '{}' not found at {}", layout, target.display()),
                });
            }
        }
    }

    errors
}
