//! One-shot cancellable timers.
//!
//! Each timer runs on its own thread blocked in `recv_timeout` on a private
//! channel. Dropping the [`TimerHandle`] closes the channel and wakes the
//! thread, which then exits without running the callback.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// Owner of a pending timer. The timer is cancelled when this is dropped.
#[derive(Debug)]
pub struct TimerHandle {
    _cancel: Sender<()>,
}

impl TimerHandle {
    /// Run `on_fire` after `delay` unless the handle is dropped first.
    pub fn arm<F>(delay: Duration, on_fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (cancel, cancelled) = mpsc::channel::<()>();
        thread::spawn(move || {
            if let Err(RecvTimeoutError::Timeout) = cancelled.recv_timeout(delay) {
                on_fire();
            }
        });
        Self { _cancel: cancel }
    }

    /// Cancel the timer. Equivalent to dropping the handle.
    pub fn cancel(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_fires_after_delay() {
        let (tx, rx) = mpsc::channel();
        let _handle = TimerHandle::arm(Duration::from_millis(20), move || {
            let _ = tx.send(());
        });
        assert!(rx.recv_timeout(Duration::from_secs(2)).is_ok());
    }

    #[test]
    fn test_cancel_prevents_fire() {
        let (tx, rx) = mpsc::channel();
        let handle = TimerHandle::arm(Duration::from_millis(50), move || {
            let _ = tx.send(());
        });
        handle.cancel();
        // Callback was dropped without running, so the channel disconnects.
        assert_eq!(
            rx.recv_timeout(Duration::from_millis(500)),
            Err(mpsc::RecvTimeoutError::Disconnected)
        );
    }
}
