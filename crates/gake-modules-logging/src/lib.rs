//! Gake logging.
//!
//! One process-wide [`Logger`] writes every record to the console (colored) and, when a state
//! directory is usable, to a gzip-compressed file (escape-stripped, flushed per record).
//! Logging never fails the program: sink problems degrade to console-only output.
//!
//! ```ignore
//! let _guard = gake_modules_logging::setup_logging(&config);
//! logmsg!(Priority::Info, Category::Misc, "Gake has been started!");
//! ```

mod bounded;
mod bridge;
mod escape;
mod logger;
mod priority;

use std::fmt;
use std::path::PathBuf;

use chrono::Local;
use gake_core::{console_write, StartupConfig};
use parking_lot::{const_mutex, Mutex};

pub use bounded::{render_bounded, MAX_LINE_LEN, MAX_MESSAGE_LEN};
pub use escape::strip_escapes;
pub use logger::{render_line, GzipSink, Logger, LoggerConfig, Sink};
pub use priority::{Category, Priority, DEBUG_ENABLED, HIGHLIGHT, HIGHLIGHT_END};

// Only the startup thread logs; the lock exists for the crash watcher, which uses `try_lock`.
static LOGGER: Mutex<Option<Logger>> = const_mutex(None);

/// Logs a formatted message at the given priority and category.
///
/// Suppressed priorities expand to nothing observable: the arguments are never formatted.
#[macro_export]
macro_rules! logmsg {
    ($priority:expr, $category:expr, $($arg:tt)+) => {{
        let priority: $crate::Priority = $priority;
        if priority.is_enabled() {
            $crate::log_args(priority, $category, ::core::format_args!($($arg)+));
        }
    }};
}

/// Releases the process-wide logger when dropped.
#[must_use = "dropping the guard closes the log file"]
pub struct LoggingGuard {
    _priv: (),
}

impl LoggingGuard {
    /// Path of the persistent log file, if one is open.
    pub fn file_path(&self) -> Option<PathBuf> {
        LOGGER
            .lock()
            .as_ref()
            .and_then(|l| l.file_path().map(|p| p.to_path_buf()))
    }
}

impl Drop for LoggingGuard {
    fn drop(&mut self) {
        halt_logging();
    }
}

/// Opens the sinks described by `cfg` and installs the `log` bridge.
///
/// Calling it again replaces the previous logger (its file is finished first).
pub fn setup_logging(cfg: &StartupConfig) -> LoggingGuard {
    halt_logging();

    let logger = Logger::open(cfg);
    bridge::install(&cfg.log_filter);
    *LOGGER.lock() = Some(logger);

    LoggingGuard { _priv: () }
}

/// Closes the persistent sink. Safe to call when logging was never set up.
pub fn halt_logging() {
    let logger = LOGGER.lock().take();
    if let Some(logger) = logger {
        if let Err(e) = logger.close() {
            console_write(format!("Failed to finish the log file: {e}\n").as_bytes());
        }
    }
}

/// Non-blocking [`halt_logging`] for the crash path. Returns `false` if the logger was busy.
pub fn try_halt_logging() -> bool {
    let Some(mut guard) = LOGGER.try_lock() else {
        return false;
    };
    if let Some(logger) = guard.take() {
        let _ = logger.close();
    }
    true
}

/// Writes one record. Before [`setup_logging`] the record goes to stderr only.
pub fn log_args(priority: Priority, category: Category, args: fmt::Arguments<'_>) {
    if !priority.is_enabled() {
        return;
    }

    let mut guard = LOGGER.lock();
    match guard.as_mut() {
        Some(logger) => logger.log(priority, category, args),
        None => console_only(priority, category, args),
    }
}

/// Non-blocking [`log_args`] for the crash path. Returns `false` if nothing was written because
/// the logger was held elsewhere.
pub fn try_log_args(priority: Priority, category: Category, args: fmt::Arguments<'_>) -> bool {
    if !priority.is_enabled() {
        return true;
    }

    let Some(mut guard) = LOGGER.try_lock() else {
        return false;
    };
    match guard.as_mut() {
        Some(logger) => logger.log(priority, category, args),
        None => console_only(priority, category, args),
    }
    true
}

fn console_only(priority: Priority, category: Category, args: fmt::Arguments<'_>) {
    let line = render_line(&Local::now(), priority, category, args, true);
    console_write(line.as_bytes());
}
