//! Progress reporting and cancellation
//!
//! The feedback loop polls [`ProgressIndicator::is_canceled`] twice per
//! iteration; it never blocks on it.

use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Progress sink with a cancellation flag.
pub trait ProgressIndicator {
    /// Whether the user asked to stop.
    fn is_canceled(&self) -> bool;

    /// Request cancellation.
    fn cancel(&self);

    /// Update the status line.
    fn set_text(&self, text: &str);

    /// Update the completion fraction (`0.0..=1.0`).
    fn set_fraction(&self, _fraction: f64) {}
}

/// Cloneable cancellation handle; all clones share one token.
///
/// Status text is mirrored to `tracing` and kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancel: CancellationToken,
    status: Arc<Mutex<String>>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token shared with async code, e.g. a signal handler.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Last status text set through [`ProgressIndicator::set_text`].
    pub fn status(&self) -> String {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ProgressIndicator for CancellationHandle {
    fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }

    fn set_text(&self, text: &str) {
        info!(status = text, "progress");
        if let Ok(mut status) = self.status.lock() {
            *status = text.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let handle = CancellationHandle::new();
        let remote = handle.clone();
        assert!(!handle.is_canceled());

        let worker = std::thread::spawn(move || remote.cancel());
        worker.join().unwrap();

        assert!(handle.is_canceled());
    }

    #[test]
    fn test_token_cancels_handle() {
        let handle = CancellationHandle::new();
        handle.token().cancel();
        assert!(handle.is_canceled());
    }

    #[test]
    fn test_status_text_is_recorded() {
        let handle = CancellationHandle::new();
        handle.set_text("Compilation tests checking");
        assert_eq!(handle.status(), "Compilation tests checking");
    }
}
