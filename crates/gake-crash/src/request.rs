use std::fmt;

use gake_core::CrashCause;
use gake_modules_logging::render_bounded;
use parking_lot::{const_mutex, Mutex};

/// Byte bound on the free-form crash detail.
pub const MAX_DETAIL_LEN: usize = 256;

/// An explicit crash request: what `raise_crash` asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashRequest {
    pub cause: CrashCause,
    pub detail: String,
}

impl CrashRequest {
    pub fn new(cause: CrashCause, args: fmt::Arguments<'_>) -> Self {
        Self {
            cause,
            detail: render_bounded(args, MAX_DETAIL_LEN),
        }
    }
}

/// Process-wide crash state. Only one report is made per process, so the last write wins.
pub struct CrashRequestSlot {
    inner: Mutex<Option<CrashRequest>>,
}

impl CrashRequestSlot {
    pub const fn new() -> Self {
        Self {
            inner: const_mutex(None),
        }
    }

    #[inline]
    pub fn record(&self, request: CrashRequest) {
        *self.inner.lock() = Some(request);
    }

    #[inline]
    pub fn take(&self) -> Option<CrashRequest> {
        self.inner.lock().take()
    }

    /// Non-blocking [`take`](Self::take). The interrupted thread may hold the lock.
    #[inline]
    pub fn try_take(&self) -> Option<CrashRequest> {
        self.inner.try_lock().and_then(|mut g| g.take())
    }
}

impl Default for CrashRequestSlot {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) static REQUEST: CrashRequestSlot = CrashRequestSlot::new();

/// Stores a crash request without raising it. A later request replaces it.
pub fn record_crash_request(cause: CrashCause, args: fmt::Arguments<'_>) {
    REQUEST.record(CrashRequest::new(cause, args));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_write_wins() {
        let slot = CrashRequestSlot::new();
        slot.record(CrashRequest::new(CrashCause::AssetsInvalid, format_args!("first")));
        slot.record(CrashRequest::new(
            CrashCause::BatteryInsufficient,
            format_args!("second"),
        ));

        let req = slot.take().unwrap();
        assert_eq!(req.cause, CrashCause::BatteryInsufficient);
        assert_eq!(req.detail, "second");
        assert_eq!(req.cause.exit_code(), 0x0D);
        assert!(slot.take().is_none());
    }

    #[test]
    fn detail_is_bounded() {
        let long = "x".repeat(4 * MAX_DETAIL_LEN);
        let req = CrashRequest::new(CrashCause::TechnicalFailure, format_args!("{long}"));
        assert!(req.detail.len() <= MAX_DETAIL_LEN);
    }

    #[test]
    fn try_take_yields_to_a_held_lock() {
        let slot = CrashRequestSlot::new();
        slot.record(CrashRequest::new(CrashCause::Hangup, format_args!("held")));
        let guard = slot.inner.lock();
        assert!(slot.try_take().is_none());
        drop(guard);
        assert_eq!(slot.try_take().map(|r| r.cause), Some(CrashCause::Hangup));
    }
}
