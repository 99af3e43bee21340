//! Cancellation and the deadline timer.
//!
//! The engine owns one [`CancelScope`]; the capture thread and the timer each
//! hold a [`CancelSignal`] and stop once it disconnects.

use std::time::Duration;

use crossbeam_channel::{after, bounded, select, Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::debug;

use crate::session::EndReason;

/// Owner side of a cancellation scope shared by the background workers.
///
/// Cancelling drops the inner sender, which disconnects every
/// [`CancelSignal`] at once. Dropping the scope cancels it too.
#[derive(Debug)]
pub struct CancelScope {
    tx: Option<Sender<()>>,
}

/// Worker side of a [`CancelScope`].
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: Receiver<()>,
}

impl CancelScope {
    pub fn new() -> (Self, CancelSignal) {
        let (tx, rx) = bounded(0);
        (Self { tx: Some(tx) }, CancelSignal { rx })
    }

    pub fn cancel(&mut self) {
        if self.tx.take().is_some() {
            debug!("cancel scope closed");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.is_none()
    }
}

impl Drop for CancelScope {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl CancelSignal {
    /// Non-blocking check.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Blocks for at most `timeout`; true once the scope is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.rx.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }

    /// Becomes ready (disconnected) when the scope is cancelled. Meant for `select!`.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Fired,
    Cancelled,
}

/// One-shot deadline: pushes a single [`EndReason::Deadline`] after `duration`
/// unless `cancel` fires first.
pub fn fire_after(duration: Duration, cancel: CancelSignal, done: Sender<EndReason>) -> TimerOutcome {
    let timer = after(duration);

    select! {
        recv(timer) -> _ => {
            if cancel.is_cancelled() {
                return TimerOutcome::Cancelled;
            }
            // a full slot means another completion is already pending
            let _ = done.try_send(EndReason::Deadline);
            debug!("deadline of {:?} reached", duration);
            TimerOutcome::Fired
        }
        recv(cancel.receiver()) -> _ => TimerOutcome::Cancelled,
    }
}
