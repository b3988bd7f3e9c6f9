//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator produces:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//! ```
//!
//! # Design Decisions
//! - Structured logging with zone and task ids as fields
//! - Metrics are cheap and no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
