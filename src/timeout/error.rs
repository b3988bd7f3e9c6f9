//! Timeout error definitions.

use std::fmt;
use thiserror::Error;

/// Which kind of deadline a scope was bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// The all-zones fallback deadline.
    Global,
    /// A named zone.
    Zone(String),
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Global => write!(f, "global scope"),
            ScopeKind::Zone(name) => write!(f, "zone '{}'", name),
        }
    }
}

/// Why the coordinator ended a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeoutReason {
    /// The deadline elapsed.
    Expired,
    /// The zone had already timed out when the scope tried to join it.
    ZoneTimedOut,
    /// The coordinator shut down while the scope was running.
    Stopped,
}

/// The error a timeout scope surfaces to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneTimeoutError {
    /// The scope's deadline elapsed and its work was cancelled.
    #[error("{scope} timed out")]
    Expired { scope: ScopeKind },

    /// Entry was refused because the zone already timed out.
    #[error("{scope} already timed out, entry refused")]
    Refused { scope: ScopeKind },

    /// The coordinator stopped before the work completed.
    #[error("timeout coordinator stopped while {scope} was active")]
    Stopped { scope: ScopeKind },
}

impl ZoneTimeoutError {
    pub(crate) fn new(scope: ScopeKind, reason: TimeoutReason) -> Self {
        match reason {
            TimeoutReason::Expired => Self::Expired { scope },
            TimeoutReason::ZoneTimedOut => Self::Refused { scope },
            TimeoutReason::Stopped => Self::Stopped { scope },
        }
    }

    /// The scope that raised the error.
    pub fn scope(&self) -> &ScopeKind {
        match self {
            Self::Expired { scope } | Self::Refused { scope } | Self::Stopped { scope } => scope,
        }
    }

    /// The reason the scope ended.
    pub fn reason(&self) -> TimeoutReason {
        match self {
            Self::Expired { .. } => TimeoutReason::Expired,
            Self::Refused { .. } => TimeoutReason::ZoneTimedOut,
            Self::Stopped { .. } => TimeoutReason::Stopped,
        }
    }
}

/// Result type for work run inside a timeout scope.
pub type TimeoutResult<T> = Result<T, ZoneTimeoutError>;
