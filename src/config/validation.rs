//! Configuration validation
//!
//! Problems are collected, not thrown: an invalid backend is reported and
//! skipped while the rest of the router keeps working.

use crate::config::{BackendConfig, Config};
use schemars::schema_for;
use serde_json::Value;
use std::collections::HashSet;
use validator::Validate;

/// Validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Configuration validator
pub struct ConfigValidator {
    schema: Value,
}

impl ConfigValidator {
    pub fn new() -> Self {
        let schema = schema_for!(Config);
        Self {
            schema: serde_json::to_value(&schema).unwrap_or_default(),
        }
    }

    /// JSON Schema for the configuration file
    pub fn get_schema(&self) -> &Value {
        &self.schema
    }

    pub fn export_schema(&self) -> String {
        serde_json::to_string_pretty(&self.schema).unwrap_or_default()
    }

    /// Field-level checks for one backend; empty when the backend is usable.
    pub fn validate_backend(backend: &BackendConfig) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let label = if backend.name.is_empty() {
            "<unnamed>".to_string()
        } else {
            backend.name.clone()
        };

        if let Err(validation_errors) = backend.validate() {
            let mut fields: Vec<_> = validation_errors.field_errors().into_iter().collect();
            fields.sort_by(|a, b| a.0.cmp(&b.0));
            for (field, field_errors) in fields {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| error.code.to_string());
                    errors.push(ValidationError {
                        path: format!("backends.{}.{}", label, field),
                        message,
                    });
                }
            }
        }

        errors
    }

    /// Validate a whole configuration, including cross-backend uniqueness.
    pub fn validate_config(&self, config: &Config) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(validation_errors) = config.router.validate() {
            for (field, field_errors) in validation_errors.field_errors() {
                errors.push(ValidationError {
                    path: format!("router.{}", field),
                    message: format!("{:?}", field_errors),
                });
            }
        }

        let mut names = HashSet::new();
        let mut prefixes = HashSet::new();
        for (idx, backend) in config.backends.iter().enumerate() {
            errors.extend(Self::validate_backend(backend));

            if !backend.name.is_empty() && !names.insert(backend.name.as_str()) {
                errors.push(ValidationError {
                    path: format!("backends[{}].name", idx),
                    message: format!("Duplicate backend name: {}", backend.name),
                });
            }
            if !backend.prefix.is_empty() && !prefixes.insert(backend.prefix.as_str()) {
                errors.push(ValidationError {
                    path: format!("backends[{}].prefix", idx),
                    message: format!("Duplicate backend prefix: {}", backend.prefix),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_config() {
        let config = Config {
            backends: vec![
                BackendConfig::new("ads", "http://localhost:9001", "ads_"),
                BackendConfig::new("gsc", "http://localhost:9002", "gsc_"),
            ],
            ..Default::default()
        };
        assert!(ConfigValidator::new().validate_config(&config).is_ok());
    }

    #[test]
    fn test_duplicate_prefix_is_reported() {
        let config = Config {
            backends: vec![
                BackendConfig::new("ads", "http://localhost:9001", "g_"),
                BackendConfig::new("gsc", "http://localhost:9002", "g_"),
            ],
            ..Default::default()
        };
        let errors = ConfigValidator::new().validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "backends[1].prefix");
    }

    #[test]
    fn test_backend_errors_are_collected() {
        let backend = BackendConfig::new("ads", "ftp//broken", "bad prefix");
        let errors = ConfigValidator::validate_backend(&backend);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, "backends.ads.base_url");
        assert!(errors[1].message.contains("Invalid prefix format"));
    }

    #[test]
    fn test_schema_mentions_backends() {
        let validator = ConfigValidator::new();
        assert!(validator.export_schema().contains("backends"));
    }
}
