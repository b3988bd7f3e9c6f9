//! Zone state machine.
//!
//! # States
//! - Init: created, no participant yet
//! - Entered: timer armed (or stopped by a freeze), participants running
//! - TimedOut: deadline elapsed, every participant cancelled
//! - Exited: last participant left before the deadline
//!
//! # State Transitions
//! ```text
//! Init → Entered: first participant enters, timer armed
//! Entered → TimedOut: timer fires
//! Entered → Exited: last participant exits
//! ```
//!
//! TimedOut and Exited are terminal. The coordinator purges a zone from its
//! map as soon as the participant count drops to zero, so the next scope
//! naming the zone starts a fresh window.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::ResumeMode;
use crate::timeout::error::TimeoutReason;
use crate::timeout::task::{TaskHandle, TaskId};
use crate::timeout::timer::{deadline_after, Timer, TimerId, TimerOwner, TimerSource};

/// Lifecycle state of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    Init,
    Entered,
    TimedOut,
    Exited,
}

impl ZoneState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ZoneState::TimedOut | ZoneState::Exited)
    }
}

/// A named deadline shared by every scope that joins it.
#[derive(Debug)]
pub(crate) struct Zone {
    name: String,
    duration: Duration,
    participants: Vec<TaskHandle>,
    state: ZoneState,
    timer: Timer,
    /// Time left on the window while a freeze holds the timer.
    paused: Option<Duration>,
}

impl Zone {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
            participants: Vec::new(),
            state: ZoneState::Init,
            timer: Timer::default(),
            paused: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ZoneState {
        self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_armed()
    }

    /// Register a participant. A timed-out zone refuses entry and cancels the
    /// handle straight away. Returns whether the participant was admitted.
    pub fn enter_task(
        &mut self,
        mut task: TaskHandle,
        entered_at: Instant,
        duration: Duration,
        frozen: bool,
        timers: &mut TimerSource,
    ) -> bool {
        match self.state {
            ZoneState::TimedOut => {
                tracing::warn!(
                    zone = %self.name,
                    task = task.id(),
                    "Zone already timed out, refusing entry"
                );
                task.cancel(TimeoutReason::ZoneTimedOut);
                return false;
            }
            ZoneState::Init | ZoneState::Exited => {
                self.state = ZoneState::Entered;
                self.duration = duration;
                self.start(deadline_after(entered_at, duration), frozen, timers);
            }
            ZoneState::Entered => {
                self.tighten(deadline_after(entered_at, duration), duration, frozen, timers)
            }
        }

        tracing::debug!(
            zone = %self.name,
            task = task.id(),
            participants = self.participants.len() + 1,
            "Task entered zone"
        );
        self.participants.push(task);
        true
    }

    fn start(&mut self, deadline: Instant, frozen: bool, timers: &mut TimerSource) {
        if frozen {
            self.paused = Some(deadline.saturating_duration_since(Instant::now()));
        } else {
            self.timer.arm(timers, TimerOwner::Zone(self.name.clone()), deadline);
        }
    }

    // A later participant may pull the shared deadline in, never push it out.
    fn tighten(
        &mut self,
        deadline: Instant,
        duration: Duration,
        frozen: bool,
        timers: &mut TimerSource,
    ) {
        if frozen {
            let left = deadline.saturating_duration_since(Instant::now());
            if self.paused.map_or(true, |paused| left < paused) {
                self.paused = Some(left);
                self.duration = duration;
            }
        } else if self.timer.deadline().map_or(false, |current| deadline < current) {
            tracing::debug!(zone = %self.name, "Shared zone deadline tightened");
            self.duration = duration;
            self.timer.arm(timers, TimerOwner::Zone(self.name.clone()), deadline);
        }
    }

    /// Deregister a participant. Returns true when the zone is now empty and
    /// must be dropped from the manager's map. Unknown ids (refused entries)
    /// are ignored.
    pub fn exit_task(&mut self, id: TaskId) -> bool {
        let before = self.participants.len();
        self.participants.retain(|task| task.id() != id);
        if self.participants.len() == before || !self.participants.is_empty() {
            return false;
        }

        if !self.state.is_terminal() {
            self.state = ZoneState::Exited;
            self.timer.disarm();
            self.paused = None;
            tracing::debug!(zone = %self.name, "Last task exited zone");
        }
        true
    }

    /// Handle the zone timer firing. Returns the number of participants that
    /// were cancelled, or `None` for a stale event.
    pub fn expire(&mut self, id: TimerId) -> Option<usize> {
        if !self.timer.fire(id) {
            return None;
        }

        self.state = ZoneState::TimedOut;
        self.paused = None;
        let mut cancelled = 0usize;
        for task in &mut self.participants {
            if task.cancel(TimeoutReason::Expired) {
                cancelled += 1;
            }
        }

        tracing::warn!(
            zone = %self.name,
            cancelled,
            timeout_ms = self.duration.as_millis() as u64,
            "Zone timed out"
        );
        Some(cancelled)
    }

    /// Suspend the countdown without changing state.
    pub fn stop(&mut self) {
        if let Some(left) = self.timer.disarm() {
            tracing::debug!(
                zone = %self.name,
                remaining_ms = left.as_millis() as u64,
                "Zone timer stopped"
            );
            self.paused = Some(left);
        }
    }

    /// Resume a countdown suspended by [`Zone::stop`].
    pub fn reset(&mut self, mode: ResumeMode, timers: &mut TimerSource) {
        if self.state != ZoneState::Entered || self.timer.is_armed() {
            return;
        }

        let paused = self.paused.take();
        let left = match mode {
            ResumeMode::Remaining => paused.unwrap_or(self.duration),
            ResumeMode::Restart => self.duration,
        };

        tracing::debug!(
            zone = %self.name,
            remaining_ms = left.as_millis() as u64,
            "Zone timer resumed"
        );
        let deadline = deadline_after(Instant::now(), left);
        self.timer.arm(timers, TimerOwner::Zone(self.name.clone()), deadline);
    }

    /// Cancel every participant with `reason`, used on coordinator shutdown.
    pub fn abandon(&mut self, reason: TimeoutReason) {
        self.timer.disarm();
        for task in &mut self.participants {
            task.cancel(reason);
        }
    }
}
