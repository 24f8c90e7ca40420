//! Gake crash handler.
//!
//! Hardware faults, termination signals, panics and explicit [`raise_crash`] calls all end in the
//! same place: a console report, a blocking save-or-quit prompt, an optional report file under
//! `<state>/<product>/Crash_Reports/`, and process exit with the cause code (or the signal's
//! default action for genuine OS faults).
//!
//! On unix the signal handler itself only records the signal and wakes a watcher thread, which
//! does the rest outside signal context.

mod handler;
mod report;
mod request;
#[cfg(unix)]
mod signals;

pub use handler::{
    raise_crash, terminate, CrashHandler, CrashReporter, Disposition, WATCHER_THREAD,
};
pub use report::CrashReport;
pub use request::{record_crash_request, CrashRequest, CrashRequestSlot, MAX_DETAIL_LEN};
#[cfg(unix)]
pub use signals::{SignalEvent, CRASH_SIGNAL, HANDLED, IGNORED};
