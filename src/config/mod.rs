//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CoordinatorConfig (validated, immutable)
//!     → TimeoutConfig handed to TimeoutManager::new
//!     → ObservabilityConfig handed to init_logging
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The default cool-down is configuration, not a constant

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::CoordinatorConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::ResumeMode;
pub use schema::TimeoutConfig;
