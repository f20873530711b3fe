//! Configuration validation.
//!
//! Checks that required values are present and within valid ranges before
//! the transcriber is built.

use std::str::FromStr;
use thiserror::Error;

use crate::config::{Config, ObservabilityConfig, SttConfig};

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.stt.validate() {
            errors.push(e);
        }

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load, apply env overrides and validate configuration.
    pub fn load_and_validate(path: Option<&std::path::Path>) -> crate::Result<Self> {
        let config = Self::load_with_env(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Check that `value` is an absolute http(s) URL.
fn check_endpoint(field: &str, value: &str) -> ValidationResult<()> {
    let parsed = url::Url::parse(value).map_err(|e| ValidationError::InvalidValue {
        field: field.into(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ValidationError::InvalidValue {
            field: field.into(),
            reason: format!("unsupported scheme '{other}', expected http or https"),
        }),
    }
}

impl Validate for SttConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.url.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "stt.url".into(),
            });
        }
        check_endpoint("stt.url", self.url.trim())?;

        if let Some(backup) = self.backup_url() {
            check_endpoint("stt.backup_url", backup)?;
        }

        if self.language.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "stt.language".into(),
            });
        }

        if self.model.trim().is_empty() {
            return Err(ValidationError::MissingField {
                field: "stt.model".into(),
            });
        }

        if self.beam_size == 0 {
            return Err(ValidationError::InvalidValue {
                field: "stt.beam_size".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "stt.request_timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        if tracing::Level::from_str(&self.log_level).is_err() {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("unknown level '{}'", self.log_level),
            });
        }

        match self.log_format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("unknown format '{other}', expected json or pretty"),
            }),
        }
    }
}
