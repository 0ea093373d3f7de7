use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time;

use crate::connection::frame::Frame;
use crate::error::MiniRedisCommandError;

/// Outcome deposited into a command once it reaches a terminal state.
pub type Outcome = Result<Frame, MiniRedisCommandError>;

const PENDING: u8 = 0;
/// Transient: a winner is depositing the outcome.
const COMPLETING: u8 = 1;
const COMPLETED: u8 = 2;
const FAILED: u8 = 3;
const CANCELLED: u8 = 4;

/// Completion state shared between a `Command` and its handles.
///
/// The status only ever leaves `PENDING` through a single `compare_exchange`,
/// so exactly one caller deposits the outcome. Every later attempt is a no-op.
#[derive(Debug)]
pub(crate) struct CompletionState {
    status: AtomicU8,

    /// Written exactly once, by the caller that won the status transition.
    outcome: Mutex<Option<Outcome>>,

    /// Wakes blocking waiters.
    ready: Condvar,

    /// Wakes async waiters.
    notify: Notify,
}

impl CompletionState {
    pub(crate) fn new() -> Self {
        CompletionState {
            status: AtomicU8::new(PENDING),
            outcome: Mutex::new(None),
            ready: Condvar::new(),
            notify: Notify::new(),
        }
    }

    pub(crate) fn complete(&self, value: Frame) -> bool {
        self.transition(COMPLETED, Ok(value))
    }

    pub(crate) fn complete_exceptionally(&self, err: MiniRedisCommandError) -> bool {
        self.transition(FAILED, Err(err))
    }

    pub(crate) fn cancel(&self) -> bool {
        self.transition(CANCELLED, Err(MiniRedisCommandError::Cancelled))
    }

    pub(crate) fn is_done(&self) -> bool {
        self.status.load(Ordering::Acquire) >= COMPLETED
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.status.load(Ordering::Acquire) == CANCELLED
    }

    fn transition(&self, terminal: u8, outcome: Outcome) -> bool {
        if self
            .status
            .compare_exchange(PENDING, COMPLETING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        {
            let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
            *slot = Some(outcome);
            self.status.store(terminal, Ordering::Release);
        }

        self.ready.notify_all();
        self.notify.notify_waiters();
        true
    }

    fn outcome(&self) -> Option<Outcome> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Caller-side view of a submitted command.
///
/// Handles are cheap to clone; every clone observes the same completion. The
/// result can be retrieved any number of times.
#[derive(Debug, Clone)]
pub struct CompletionHandle {
    id: u64,
    state: Arc<CompletionState>,
}

impl CompletionHandle {
    pub(crate) fn new(id: u64, state: Arc<CompletionState>) -> Self {
        CompletionHandle { id, state }
    }

    /// Identifier of the command this handle tracks.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancel the command.
    ///
    /// Returns `false` if the command already reached a terminal state. A
    /// cancelled command that is still queued is never handed to a writer; one
    /// that was already written keeps its cancellation when the reply arrives.
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    /// Returns `true` once the command completed, failed or was cancelled.
    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.is_cancelled()
    }

    /// Returns the outcome without waiting, `None` while the command is pending.
    pub fn try_get(&self) -> Option<Outcome> {
        if !self.state.is_done() {
            return None;
        }
        self.state.outcome()
    }

    /// Wait for the command to reach a terminal state.
    ///
    /// A failed command yields the error it failed with, a cancelled one
    /// yields `MiniRedisCommandError::Cancelled`.
    pub async fn get(&self) -> Outcome {
        loop {
            // Register interest before checking, so a completion landing in
            // between is not missed.
            let notified = self.state.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(outcome) = self.try_get() {
                return outcome;
            }

            notified.await;
        }
    }

    /// Like `get`, but gives up after `timeout`.
    ///
    /// Returns `None` when the timeout elapses. The command itself is left
    /// untouched and may still complete later.
    pub async fn get_timeout(&self, timeout: Duration) -> Option<Outcome> {
        time::timeout(timeout, self.get()).await.ok()
    }

    /// Block the current thread until the command reaches a terminal state.
    ///
    /// Must not be called from within an async context.
    pub fn get_blocking(&self) -> Outcome {
        let mut slot = self
            .state
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            slot = self
                .state
                .ready
                .wait(slot)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn complete_exceptionally(&self, err: MiniRedisCommandError) -> bool {
        self.state.complete_exceptionally(err)
    }
}
