//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the timeout coordinator.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Deadline and freeze behaviour.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// How a countdown resumes once the last freeze covering it is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResumeMode {
    /// Continue with the time that was left when the freeze began.
    #[default]
    Remaining,
    /// Start the full configured window again.
    Restart,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Cool-down applied to global scopes that don't set their own, in
    /// milliseconds.
    pub default_cool_down_ms: u64,

    /// Resume policy after a freeze.
    pub resume_mode: ResumeMode,
}

impl TimeoutConfig {
    pub fn default_cool_down(&self) -> Duration {
        Duration::from_millis(self.default_cool_down_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_cool_down_ms: 0,
            resume_mode: ResumeMode::Remaining,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty output for development, JSON for log aggregation.
    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: CoordinatorConfig = toml::from_str("").unwrap();
        assert_eq!(config.timeouts.default_cool_down(), Duration::ZERO);
        assert_eq!(config.timeouts.resume_mode, ResumeMode::Remaining);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_document() {
        let config: CoordinatorConfig = toml::from_str(
            r#"
            [timeouts]
            default_cool_down_ms = 60000
            resume_mode = "restart"

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.timeouts.default_cool_down(), Duration::from_secs(60));
        assert_eq!(config.timeouts.resume_mode, ResumeMode::Restart);
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
