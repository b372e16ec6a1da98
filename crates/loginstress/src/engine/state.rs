use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    RateLimited,
    Blocked,
    Interrupted,
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCause::RateLimited => f.write_str("You have been rate limited"),
            StopCause::Blocked => f.write_str("You have been blocked"),
            StopCause::Interrupted => f.write_str("Interrupted"),
        }
    }
}

/// Run-wide stop flag shared between the orchestrator and its workers.
///
/// Starts cleared, is set at most once and never resets. Later requests
/// are no-ops, so the first cause is the one reported.
#[derive(Debug, Default)]
pub struct RunState {
    stopped: AtomicBool,
    cause: OnceLock<StopCause>,
    token: CancellationToken,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the call that actually set the flag.
    pub fn request_stop(&self, cause: StopCause) -> bool {
        if self
            .stopped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        let _ = self.cause.set(cause);
        self.token.cancel();
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn cause(&self) -> Option<StopCause> {
        self.cause.get().copied()
    }

    /// Resolves once a stop has been requested.
    pub async fn stopped(&self) {
        self.token.cancelled().await;
    }
}
