//! All-zones fallback deadline.
//!
//! # Phases
//! ```text
//! Counting → CoolingDown: deadline fires while zones or other global tasks are pending
//! Counting → TimedOut:    deadline fires with nothing else pending
//! CoolingDown → TimedOut: cool-down fires
//! ```
//!
//! The cool-down gives inner, more specific zone deadlines a chance to fire
//! and surface their own error before the whole operation is cancelled.

use std::time::Duration;
use tokio::time::Instant;

use crate::config::ResumeMode;
use crate::timeout::error::TimeoutReason;
use crate::timeout::task::{TaskHandle, TaskId};
use crate::timeout::timer::{deadline_after, Timer, TimerId, TimerOwner, TimerSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GlobalPhase {
    Counting,
    CoolingDown,
    TimedOut,
}

/// Outcome of a global timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Firing {
    Stale,
    CoolingDown,
    Cancelled,
}

/// A deadline bound to one top-level operation.
#[derive(Debug)]
pub(crate) struct GlobalTask {
    task: TaskHandle,
    duration: Duration,
    cool_down: Duration,
    phase: GlobalPhase,
    timer: Timer,
    paused: Option<Duration>,
}

impl GlobalTask {
    pub fn new(task: TaskHandle, duration: Duration, cool_down: Duration) -> Self {
        Self {
            task,
            duration,
            cool_down,
            phase: GlobalPhase::Counting,
            timer: Timer::default(),
            paused: None,
        }
    }

    pub fn id(&self) -> TaskId {
        self.task.id()
    }

    pub fn phase(&self) -> GlobalPhase {
        self.phase
    }

    fn owner(&self) -> TimerOwner {
        TimerOwner::Global(self.task.id())
    }

    /// Start counting from `entered_at`. A task created under an active
    /// freeze holds its full window until thawed.
    pub fn start(&mut self, entered_at: Instant, frozen: bool, timers: &mut TimerSource) {
        let deadline = deadline_after(entered_at, self.duration);
        if frozen {
            self.paused = Some(deadline.saturating_duration_since(Instant::now()));
        } else {
            let owner = self.owner();
            self.timer.arm(timers, owner, deadline);
        }
    }

    /// Handle this task's timer firing. `others_pending` reports whether any
    /// zone or other global task is still live.
    pub fn on_timer(
        &mut self,
        id: TimerId,
        others_pending: bool,
        timers: &mut TimerSource,
    ) -> Firing {
        if !self.timer.fire(id) {
            return Firing::Stale;
        }

        if self.phase == GlobalPhase::Counting && others_pending {
            self.phase = GlobalPhase::CoolingDown;
            tracing::debug!(
                task = self.task.id(),
                cool_down_ms = self.cool_down.as_millis() as u64,
                "Global deadline reached with work pending, cooling down"
            );
            let owner = self.owner();
            self.timer.arm(timers, owner, deadline_after(Instant::now(), self.cool_down));
            return Firing::CoolingDown;
        }

        self.phase = GlobalPhase::TimedOut;
        self.paused = None;
        self.task.cancel(TimeoutReason::Expired);
        tracing::warn!(
            task = self.task.id(),
            timeout_ms = self.duration.as_millis() as u64,
            "Global task timed out"
        );
        Firing::Cancelled
    }

    pub fn stop(&mut self) {
        if let Some(left) = self.timer.disarm() {
            tracing::debug!(
                task = self.task.id(),
                remaining_ms = left.as_millis() as u64,
                "Global timer stopped"
            );
            self.paused = Some(left);
        }
    }

    pub fn reset(&mut self, mode: ResumeMode, timers: &mut TimerSource) {
        if self.phase == GlobalPhase::TimedOut || self.timer.is_armed() {
            return;
        }

        let window = match self.phase {
            GlobalPhase::CoolingDown => self.cool_down,
            _ => self.duration,
        };
        let paused = self.paused.take();
        let left = match mode {
            ResumeMode::Remaining => paused.unwrap_or(window),
            ResumeMode::Restart => window,
        };

        tracing::debug!(
            task = self.task.id(),
            remaining_ms = left.as_millis() as u64,
            "Global timer resumed"
        );
        let owner = self.owner();
        self.timer.arm(timers, owner, deadline_after(Instant::now(), left));
    }

    pub fn abandon(&mut self, reason: TimeoutReason) {
        self.timer.disarm();
        self.task.cancel(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;
    use tokio::time;

    fn global(
        id: TaskId,
        duration_ms: u64,
        cool_down_ms: u64,
    ) -> (GlobalTask, oneshot::Receiver<TimeoutReason>) {
        let (tx, rx) = oneshot::channel();
        let task = GlobalTask::new(
            TaskHandle::new(id, tx),
            Duration::from_millis(duration_ms),
            Duration::from_millis(cool_down_ms),
        );
        (task, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancels_when_nothing_pending() {
        let (mut timers, mut expiries) = TimerSource::new();
        let (mut task, mut rx) = global(1, 100, 1000);
        task.start(Instant::now(), false, &mut timers);

        let expiry = expiries.recv().await.unwrap();
        assert_eq!(expiry.owner, TimerOwner::Global(1));
        assert_eq!(task.on_timer(expiry.id, false, &mut timers), Firing::Cancelled);
        assert_eq!(rx.try_recv().unwrap(), TimeoutReason::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cool_down_when_zones_pending() {
        let (mut timers, mut expiries) = TimerSource::new();
        let (mut task, mut rx) = global(1, 100, 50);
        let start = Instant::now();
        task.start(start, false, &mut timers);

        let expiry = expiries.recv().await.unwrap();
        assert_eq!(task.on_timer(expiry.id, true, &mut timers), Firing::CoolingDown);
        assert_eq!(task.phase(), GlobalPhase::CoolingDown);
        assert!(rx.try_recv().is_err());

        let expiry = expiries.recv().await.unwrap();
        assert!(Instant::now() >= start + Duration::from_millis(150));
        assert_eq!(task.on_timer(expiry.id, true, &mut timers), Firing::Cancelled);
        assert_eq!(rx.try_recv().unwrap(), TimeoutReason::Expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_freeze_during_cool_down_resumes_cool_down() {
        let (mut timers, mut expiries) = TimerSource::new();
        let (mut task, _rx) = global(1, 100, 400);
        task.start(Instant::now(), false, &mut timers);

        let expiry = expiries.recv().await.unwrap();
        task.on_timer(expiry.id, true, &mut timers);
        task.stop();
        time::sleep(Duration::from_secs(2)).await;

        task.reset(ResumeMode::Restart, &mut timers);
        let resumed = Instant::now();
        let expiry = expiries.recv().await.unwrap();
        assert!(Instant::now() - resumed >= Duration::from_millis(400));
        assert_eq!(task.on_timer(expiry.id, false, &mut timers), Firing::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_task_ignores_stale_expiry() {
        let (mut timers, mut expiries) = TimerSource::new();
        let (mut task, mut rx) = global(3, 10, 0);
        task.start(Instant::now(), false, &mut timers);

        let expiry = expiries.recv().await.unwrap();
        task.stop();
        assert_eq!(task.on_timer(expiry.id, false, &mut timers), Firing::Stale);
        assert!(rx.try_recv().is_err());
    }
}
