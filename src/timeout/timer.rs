//! Cancellable single-shot alarm bound to the runtime clock.
//!
//! Each arm spawns a sleeper that posts an [`Expiry`] back to the
//! coordinator. Every arm gets a fresh id, so an event that was already in
//! flight when the timer was cancelled or rescheduled is recognised as stale.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

pub(crate) type TimerId = u64;

/// Longest window a timer is ever armed for. Longer durations mean "never"
/// for all practical purposes.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// The instant `after` past `start`, clamped so that huge durations such as
/// `Duration::MAX` never overflow the clock.
pub(crate) fn deadline_after(start: Instant, after: Duration) -> Instant {
    start
        .checked_add(after.min(FAR_FUTURE))
        .unwrap_or_else(|| Instant::now() + FAR_FUTURE)
}

/// The entity a timer belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum TimerOwner {
    Zone(String),
    Global(u64),
}

/// An alarm that went off.
#[derive(Debug)]
pub(crate) struct Expiry {
    pub owner: TimerOwner,
    pub id: TimerId,
}

/// Issues timer ids and carries the channel expiries are delivered on.
#[derive(Debug)]
pub(crate) struct TimerSource {
    tx: mpsc::UnboundedSender<Expiry>,
    next_id: TimerId,
}

impl TimerSource {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Expiry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, next_id: 0 }, rx)
    }

    fn next_id(&mut self) -> TimerId {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug)]
struct Armed {
    id: TimerId,
    deadline: Instant,
    sleeper: JoinHandle<()>,
}

/// A single-shot alarm. Dropping it cancels any pending firing.
#[derive(Debug, Default)]
pub(crate) struct Timer {
    armed: Option<Armed>,
}

impl Timer {
    /// Arm (or re-arm) the timer to fire at `deadline`.
    pub fn arm(&mut self, source: &mut TimerSource, owner: TimerOwner, deadline: Instant) {
        self.disarm();

        let id = source.next_id();
        let tx = source.tx.clone();
        let sleeper = tokio::spawn(async move {
            time::sleep_until(deadline).await;
            let _ = tx.send(Expiry { owner, id });
        });

        self.armed = Some(Armed { id, deadline, sleeper });
    }

    /// Cancel the pending firing. Returns the time that was left, if armed.
    pub fn disarm(&mut self) -> Option<Duration> {
        let armed = self.armed.take()?;
        armed.sleeper.abort();
        Some(armed.deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|a| a.deadline)
    }

    /// Accept an expiry event. Returns false for events from a superseded arm.
    pub fn fire(&mut self, id: TimerId) -> bool {
        match &self.armed {
            Some(armed) if armed.id == id => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.disarm();
    }
}
