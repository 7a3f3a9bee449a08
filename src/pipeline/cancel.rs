//! Cooperative cancellation for the sampling loop.
//!
//! Nothing is ever sent on the channel: cancelling drops the only sender,
//! which every cloned token observes as a disconnect. Waiting on the token
//! doubles as the loop's sleep, so a cancel interrupts it immediately.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Create a linked cancel handle and token.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = bounded(0);
    (
        CancelHandle {
            tx: Arc::new(Mutex::new(Some(tx))),
        },
        CancelToken { rx },
    )
}

/// Requests cancellation. Cheap to clone and safe to call from a signal handler thread.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<Mutex<Option<Sender<()>>>>,
}

impl CancelHandle {
    /// Cancel every linked token. Calling this more than once is harmless.
    pub fn cancel(&self) {
        let mut tx = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        tx.take();
    }
}

/// Observes cancellation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for `duration` unless cancelled first. Returns `true` if cancelled.
    pub fn sleep(&self, duration: Duration) -> bool {
        !matches!(self.rx.recv_timeout(duration), Err(RecvTimeoutError::Timeout))
    }
}
