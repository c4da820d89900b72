use std::time::Duration;

use notesync_core::{Scheduler, Timer, TimerHandle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// [`Scheduler`] backed by `tokio::time::sleep`.
///
/// Must be used from inside a tokio runtime. Every timer is a child of one
/// root token, so [`shutdown`](Self::shutdown) stops all of them at once.
#[derive(Debug)]
pub struct TimerScheduler {
    root: CancellationToken,
    fired: mpsc::UnboundedSender<Timer>,
}

impl TimerScheduler {
    /// Returns the scheduler and the receiver that yields fired timers.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Timer>) {
        let (fired, rx) = mpsc::unbounded_channel();
        (Self { root: CancellationToken::new(), fired }, rx)
    }

    /// Cancel every pending timer.
    pub fn shutdown(&self) {
        self.root.cancel();
    }
}

impl Scheduler for TimerScheduler {
    fn schedule(&self, delay: Duration, timer: Timer) -> TimerHandle {
        let token = self.root.child_token();
        let cancel = token.clone();
        let fired = self.fired.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {
                    trace!(timer_id = timer.id, kind = ?timer.kind, "timer cancelled");
                }
                () = tokio::time::sleep(delay) => {
                    if !cancel.is_cancelled() {
                        // Receiver gone means the worker stopped.
                        let _ = fired.send(timer);
                    }
                }
            }
        });

        TimerHandle::new(token)
    }
}

impl Drop for TimerScheduler {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
