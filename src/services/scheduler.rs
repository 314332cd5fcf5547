//! Single-slot cancellable timer for the poll loop
//!
//! At most one cycle is ever pending. Scheduling replaces the pending one,
//! cancelling drops it. `fired()` is cancel-safe: the sleep lives in the slot,
//! so dropping the future inside `select!` does not lose the deadline.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, Instant, Sleep};

#[derive(Debug, Default)]
pub struct PollTimer {
    pending: Option<Pin<Box<Sleep>>>,
}

impl PollTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the timer `delay` from now, replacing any pending deadline
    pub fn schedule(&mut self, delay: Duration) {
        self.pending = Some(Box::pin(sleep(delay)));
    }

    /// Drop the pending deadline. Returns true if one was armed.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|s| s.deadline())
    }

    /// Resolve when the pending deadline passes, disarming the slot.
    /// Never resolves while nothing is scheduled.
    pub async fn fired(&mut self) {
        match self.pending.as_mut() {
            Some(deadline) => {
                deadline.as_mut().await;
                self.pending = None;
            }
            None => pending::<()>().await,
        }
    }
}
