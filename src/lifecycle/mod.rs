//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Owner triggers → Coordinator leaves its loop
//!     → live scopes end with TimeoutReason::Stopped → timers aborted
//! ```
//!
//! # Design Decisions
//! - The coordinator is owned by whoever runs it; no module-level singleton
//! - Dropping every manager handle stops the coordinator too

pub mod shutdown;

pub use shutdown::Shutdown;
