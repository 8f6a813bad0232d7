use std::collections::HashSet;

use crate::config::models::{DownstreamRoute, RequesterConfig};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid duration '{value}' for '{field}': {reason}")]
    InvalidDuration {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unknown handler '{name}' referenced by {owner}")]
    UnknownHandler { name: String, owner: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Requester configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the whole configuration against the set of registered handler names.
    pub fn validate(config: &RequesterConfig, known_handlers: &[&str]) -> ValidationResult<()> {
        let mut errors = Vec::new();
        let known: HashSet<&str> = known_handlers.iter().copied().collect();

        if let Err(e) = Self::validate_duration("default_timeout", &config.default_timeout) {
            errors.push(e);
        }
        if let Err(e) = Self::validate_duration("pool.expiry", &config.pool.expiry) {
            errors.push(e);
        }
        if let Some(interval) = &config.pool.sweep_interval {
            if let Err(e) = Self::validate_duration("pool.sweep_interval", interval) {
                errors.push(e);
            }
        }

        if config.default_client_name.trim().is_empty() {
            errors.push(ValidationError::InvalidField {
                field: "default_client_name".to_string(),
                message: "Client name must not be empty".to_string(),
            });
        }

        errors.extend(Self::validate_handler_list(
            &config.global_handlers,
            "global_handlers",
            &known,
        ));

        for (name, route) in &config.routes {
            errors.extend(Self::validate_route(name, route, &known));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    fn validate_duration(field: &str, value: &str) -> ValidationResult<()> {
        match humantime::parse_duration(value) {
            Ok(duration) if duration.is_zero() => Err(ValidationError::InvalidDuration {
                field: field.to_string(),
                value: value.to_string(),
                reason: "Duration must be greater than zero".to_string(),
            }),
            Ok(_) => Ok(()),
            Err(e) => Err(ValidationError::InvalidDuration {
                field: field.to_string(),
                value: value.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn validate_route(
        name: &str,
        route: &DownstreamRoute,
        known: &HashSet<&str>,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, template) in [
            ("upstream_path_template", &route.upstream_path_template),
            ("downstream_path_template", &route.downstream_path_template),
        ] {
            if !template.is_empty() && !template.starts_with('/') {
                errors.push(ValidationError::InvalidField {
                    field: format!("route '{name}' {field}"),
                    message: "Path templates must start with '/'".to_string(),
                });
            }
        }

        if let Some(service_name) = &route.service_name {
            if service_name.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("route '{name}' service_name"),
                    message: "Service name must not be blank when set".to_string(),
                });
            }
        }

        errors.extend(Self::validate_handler_list(
            &route.delegating_handlers,
            &format!("route '{name}'"),
            known,
        ));
        errors
    }

    fn validate_handler_list(
        handlers: &[String],
        owner: &str,
        known: &HashSet<&str>,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();

        for handler in handlers {
            if handler.trim().is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: owner.to_string(),
                    message: "Handler names must not be empty".to_string(),
                });
                continue;
            }
            if !seen.insert(handler.as_str()) {
                errors.push(ValidationError::InvalidField {
                    field: owner.to_string(),
                    message: format!("Handler '{handler}' is listed more than once"),
                });
            }
            if !known.contains(handler.as_str()) {
                errors.push(ValidationError::UnknownHandler {
                    name: handler.clone(),
                    owner: owner.to_string(),
                });
            }
        }
        errors
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        if errors.len() == 1 {
            return errors[0].to_string();
        }

        let mut message = format!("Found {} validation errors:\n", errors.len());
        for (i, error) in errors.iter().enumerate() {
            message.push_str(&format!("  {}. {}\n", i + 1, error));
        }
        message
    }
}
