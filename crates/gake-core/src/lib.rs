//! Gake core
//!
//! Types shared by the logger, the startup checks and the crash handler.
//! Nothing in here touches global state except [`ShutdownToken`].

pub mod cause;
pub mod console;
pub mod error;
pub mod host;
pub mod paths;
pub mod startup;
pub mod sync;

pub use cause::CrashCause;
pub use console::{console_write, RawStderr};
pub use error::{GakeError, GakeResult};
pub use host::{ConsoleDialog, CrashChoice, Dialog};
pub use paths::{file_timestamp, resolve_state_dir, resolve_state_dir_with, StateDir, StateDirSource};
pub use startup::{ConfigPaths, StartupConfig, StartupLoadReport, StartupLoader, StartupOverrides};
pub use sync::ShutdownToken;
