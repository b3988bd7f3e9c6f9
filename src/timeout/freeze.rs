//! Freezes: scoped pauses of deadline countdowns.
//!
//! # Responsibilities
//! - Track active freezes and which timers each one covers
//! - Provide the two acquisition guards (async and blocking)
//!
//! # Design Decisions
//! - Freezes are counted, not boolean: only the first freeze covering a
//!   timer stops it and only the last one releases it
//! - A zone freeze covers its own zone plus every global task; an unnamed
//!   freeze covers everything
//! - Both guards post the same commands to the coordinator; the blocking
//!   guard never waits for the coordinator
//! - Releasing an unknown freeze is a no-op

use tokio::sync::{mpsc, oneshot};

use crate::timeout::manager::Command;

pub(crate) type FreezeId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FreezeEntry {
    pub id: FreezeId,
    pub zone: Option<String>,
}

impl FreezeEntry {
    pub fn covers_zone(&self, name: &str) -> bool {
        self.zone.as_deref().map_or(true, |zone| zone == name)
    }
}

/// The coordinator's list of active freezes.
#[derive(Debug, Default)]
pub(crate) struct FreezeSet {
    entries: Vec<FreezeEntry>,
}

impl FreezeSet {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Global tasks span every zone, so any freeze holds them.
    pub fn globals_frozen(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn zone_frozen(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.covers_zone(name))
    }

    pub fn push(&mut self, entry: FreezeEntry) {
        self.entries.push(entry);
    }

    pub fn remove(&mut self, id: FreezeId) -> Option<FreezeEntry> {
        let index = self.entries.iter().position(|entry| entry.id == id)?;
        Some(self.entries.remove(index))
    }
}

/// Posts the thaw for one freeze exactly once.
#[derive(Debug)]
struct Release {
    commands: mpsc::UnboundedSender<Command>,
    id: FreezeId,
    done: bool,
}

impl Release {
    fn thaw(&mut self, ack: Option<oneshot::Sender<()>>) {
        if self.done {
            return;
        }
        self.done = true;

        if self.commands.send(Command::Thaw { id: self.id, ack }).is_err() {
            tracing::debug!(freeze = self.id, "Coordinator gone, nothing to thaw");
        }
    }
}

impl Drop for Release {
    fn drop(&mut self) {
        self.thaw(None);
    }
}

/// A freeze held by async code on the runtime.
///
/// Obtained from [`TimeoutManager::freeze`](crate::TimeoutManager::freeze),
/// which resolves once every covered timer is stopped. Dropping the guard
/// thaws without waiting; [`FreezeGuard::release`] waits for the timers to
/// be rearmed.
#[must_use = "the freeze is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct FreezeGuard {
    release: Release,
}

impl FreezeGuard {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, id: FreezeId) -> Self {
        Self {
            release: Release { commands, id, done: false },
        }
    }

    /// Release the freeze and wait until the coordinator has applied it.
    pub async fn release(mut self) {
        let (tx, rx) = oneshot::channel();
        self.release.thaw(Some(tx));
        let _ = rx.await;
    }
}

/// A freeze held by blocking code on a worker thread.
///
/// Acquiring and dropping it only post to the coordinator; neither waits.
/// The coordinator applies the freeze before any timer expiry that arrives
/// after it.
#[must_use = "the freeze is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct BlockingFreezeGuard {
    release: Release,
}

impl BlockingFreezeGuard {
    pub(crate) fn new(commands: mpsc::UnboundedSender<Command>, id: FreezeId) -> Self {
        Self {
            release: Release { commands, id, done: false },
        }
    }

    /// Release the freeze now rather than at the end of the scope.
    pub fn release(mut self) {
        self.release.thaw(None);
    }
}
