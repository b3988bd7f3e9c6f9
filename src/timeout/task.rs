//! Coordinator-side handle on one scope's unit of work.

use tokio::sync::oneshot;

use crate::timeout::error::TimeoutReason;

pub(crate) type TaskId = u64;

/// One caller's registration. Cancelling it resolves the scope's waiter,
/// which drops the wrapped future.
#[derive(Debug)]
pub(crate) struct TaskHandle {
    id: TaskId,
    notify: Option<oneshot::Sender<TimeoutReason>>,
}

impl TaskHandle {
    pub fn new(id: TaskId, notify: oneshot::Sender<TimeoutReason>) -> Self {
        Self {
            id,
            notify: Some(notify),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Cancel the bound work. Only the first call has an effect; returns
    /// whether this call delivered the cancellation.
    pub fn cancel(&mut self, reason: TimeoutReason) -> bool {
        match self.notify.take() {
            Some(tx) => tx.send(reason).is_ok(),
            None => false,
        }
    }

    /// Whether the scope on the other end has already finished.
    pub fn is_finished(&self) -> bool {
        self.notify.as_ref().map_or(true, |tx| tx.is_closed())
    }
}
