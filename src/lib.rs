//! Zone-based cooperative timeouts and freezes.
//!
//! Work is bounded either by a named zone deadline, shared by every scope
//! that joins the zone, or by a global deadline bound to one operation.
//! Code that legitimately blocks (disk flushes, database commits) can
//! freeze the countdowns from async code or from a worker thread.

pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod timeout;

pub use config::schema::CoordinatorConfig;
pub use lifecycle::Shutdown;
pub use timeout::{
    BlockingFreezeGuard, Coordinator, FreezeGuard, ScopeKind, Snapshot, TimeoutManager,
    TimeoutReason, TimeoutResult, TimeoutScope, ZoneSnapshot, ZoneState, ZoneTimeoutError,
    ALL_ZONES,
};
