//! Zone-based cooperative timeouts.
//!
//! # Data Flow
//! ```text
//! Caller (async task or worker thread):
//!     → TimeoutManager::async_timeout / freeze / freeze_blocking
//!     → Command posted on the coordinator channel
//!
//! Coordinator (manager.rs, one task):
//!     → zone.rs (named deadline shared by all its participants)
//!     → global.rs (all-zones deadline bound to one operation, with cool-down)
//!     → freeze.rs (counted pauses of covered timers)
//!     → timer.rs (single-shot alarms posting expiries back)
//!
//! On expiry:
//!     coordinator cancels the participant handles (task.rs)
//!     → scope.rs drops the wrapped future and returns ZoneTimeoutError
//! ```
//!
//! # Design Decisions
//! - Only the coordinator mutates timeout state; there are no locks
//! - Zone deadlines are shared: the first participant fixes the window and
//!   later ones can only tighten it
//! - Freezing never raises; expiry always surfaces as a timeout error to the
//!   scope that owned the deadline

pub mod error;
pub mod freeze;
pub mod manager;
pub mod scope;
mod global;
mod task;
mod timer;
pub mod zone;

pub use error::{ScopeKind, TimeoutReason, TimeoutResult, ZoneTimeoutError};
pub use freeze::{BlockingFreezeGuard, FreezeGuard};
pub use manager::{Coordinator, Snapshot, TimeoutManager, ZoneSnapshot, ALL_ZONES};
pub use scope::TimeoutScope;
pub use zone::ZoneState;
