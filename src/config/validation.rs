//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and known names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CoordinatorConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::CoordinatorConfig;

/// Longest cool-down accepted, in milliseconds.
pub const MAX_COOL_DOWN_MS: u64 = 60 * 60 * 1000;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("timeouts.default_cool_down_ms is {value}, maximum is {max}")]
    CoolDownTooLong { value: u64, max: u64 },

    #[error("observability.log_level '{0}' is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),
}

/// Check a parsed configuration.
pub fn validate_config(config: &CoordinatorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.timeouts.default_cool_down_ms > MAX_COOL_DOWN_MS {
        errors.push(ValidationError::CoolDownTooLong {
            value: config.timeouts.default_cool_down_ms,
            max: MAX_COOL_DOWN_MS,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(config.observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
