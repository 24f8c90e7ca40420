use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Process-wide cooperative shutdown flag.
///
/// The crash handler raises it when a benign interrupt arrives; the event loop polls it.
/// Only an atomic is touched, so [`ShutdownToken::request`] is async-signal-safe.
pub struct ShutdownToken;

impl ShutdownToken {
    #[inline]
    pub fn request() {
        SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_requested() -> bool {
        SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
    }
}
