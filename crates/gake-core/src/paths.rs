use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

/// Sub-directory of the product dir that holds saved crash reports.
pub const CRASH_REPORTS_DIR: &str = "Crash_Reports";

/// Which rung of the fallback chain produced the state directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateDirSource {
    /// Set explicitly via config or `GAKE_STATE_DIR`.
    Configured,
    /// `$XDG_STATE_HOME`.
    XdgStateHome,
    /// `$HOME/.local/state`.
    Home,
    /// Neither variable was usable.
    TempDir,
}

impl StateDirSource {
    #[inline]
    pub fn is_fallback(self) -> bool {
        matches!(self, StateDirSource::TempDir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDir {
    pub path: PathBuf,
    pub source: StateDirSource,
}

impl StateDir {
    #[inline]
    pub fn product_dir(&self, product: &str) -> PathBuf {
        self.path.join(product)
    }

    #[inline]
    pub fn crash_reports_dir(&self, product: &str) -> PathBuf {
        self.product_dir(product).join(CRASH_REPORTS_DIR)
    }
}

/// Resolves the state directory from the process environment.
#[inline]
pub fn resolve_state_dir(configured: Option<&Path>) -> StateDir {
    resolve_state_dir_with(configured, |k| std::env::var_os(k))
}

/// Same as [`resolve_state_dir`] with an injectable variable lookup.
/// Empty variables count as unset.
pub fn resolve_state_dir_with<F>(configured: Option<&Path>, lookup: F) -> StateDir
where
    F: Fn(&str) -> Option<OsString>,
{
    if let Some(p) = configured {
        return StateDir {
            path: p.to_path_buf(),
            source: StateDirSource::Configured,
        };
    }

    let non_empty = |k: &str| lookup(k).filter(|v| !v.is_empty());

    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return StateDir {
            path: PathBuf::from(xdg),
            source: StateDirSource::XdgStateHome,
        };
    }

    if let Some(home) = non_empty("HOME") {
        return StateDir {
            path: PathBuf::from(home).join(".local").join("state"),
            source: StateDirSource::Home,
        };
    }

    StateDir {
        path: std::env::temp_dir(),
        source: StateDirSource::TempDir,
    }
}

/// File-name-safe local timestamp, e.g. `2021-07-04_13-37-00`.
#[inline]
pub fn file_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d_%H-%M-%S").to_string()
}
