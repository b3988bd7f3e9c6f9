//! Timeout scopes: the caller side of a zone or global deadline.

use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::timeout::error::{ScopeKind, TimeoutReason, TimeoutResult, ZoneTimeoutError};
use crate::timeout::manager::{Command, TimeoutManager};
use crate::timeout::task::{TaskHandle, TaskId};

/// A deadline waiting to be applied to a unit of work.
///
/// Created by [`TimeoutManager::async_timeout`] and friends; nothing is
/// registered until [`TimeoutScope::run`] is awaited.
#[must_use = "a timeout scope does nothing until `run` is awaited"]
#[derive(Debug, Clone)]
pub struct TimeoutScope {
    manager: TimeoutManager,
    kind: ScopeKind,
    duration: Duration,
    cool_down: Duration,
}

impl TimeoutScope {
    pub(crate) fn new(
        manager: TimeoutManager,
        kind: ScopeKind,
        duration: Duration,
        cool_down: Duration,
    ) -> Self {
        Self {
            manager,
            kind,
            duration,
            cool_down,
        }
    }

    /// Grace period a global deadline waits for pending zones before it
    /// cancels. Ignored for zone scopes.
    pub fn with_cool_down(mut self, cool_down: Duration) -> Self {
        self.cool_down = cool_down;
        self
    }

    pub fn kind(&self) -> &ScopeKind {
        &self.kind
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run `work` under this deadline.
    ///
    /// If the deadline expires first, `work` is dropped at its current await
    /// point and a [`ZoneTimeoutError`] is returned. The registration is
    /// released on every exit path, including this future being dropped by
    /// an enclosing scope.
    pub async fn run<F>(self, work: F) -> TimeoutResult<F::Output>
    where
        F: Future,
    {
        let (notify, mut cancelled) = oneshot::channel();
        let id = self.manager.next_id();
        let task = TaskHandle::new(id, notify);
        let entered_at = Instant::now();

        let command = match &self.kind {
            ScopeKind::Global => Command::EnterGlobal {
                duration: self.duration,
                cool_down: self.cool_down,
                entered_at,
                task,
            },
            ScopeKind::Zone(zone) => Command::EnterZone {
                zone: zone.clone(),
                duration: self.duration,
                entered_at,
                task,
            },
        };
        if !self.manager.send(command) {
            return Err(ZoneTimeoutError::new(self.kind, TimeoutReason::Stopped));
        }

        let _registration = Registration {
            manager: &self.manager,
            kind: &self.kind,
            id,
        };

        tokio::pin!(work);
        let result = tokio::select! {
            biased;
            reason = &mut cancelled => {
                // A dropped sender means the coordinator went away.
                let reason = reason.unwrap_or(TimeoutReason::Stopped);
                Err(ZoneTimeoutError::new(self.kind.clone(), reason))
            }
            output = &mut work => Ok(output),
        };
        result
    }
}

/// Deregisters a running scope when dropped.
struct Registration<'a> {
    manager: &'a TimeoutManager,
    kind: &'a ScopeKind,
    id: TaskId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let command = match self.kind {
            ScopeKind::Global => Command::ExitGlobal { id: self.id },
            ScopeKind::Zone(zone) => Command::ExitZone {
                zone: zone.clone(),
                id: self.id,
            },
        };
        self.manager.send(command);
    }
}
