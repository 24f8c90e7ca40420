use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::paths::{resolve_state_dir, StateDir};

/// Default install location of the shipped assets.
pub const DEFAULT_ASSETS_ROOT: &str = "/usr/local/share/Gake/Assets";
pub const DEFAULT_STARTUP_FILE: &str = "gake.json";

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub startup: Option<PathBuf>,
    pub root_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    #[inline]
    fn default() -> Self {
        Self {
            startup: Some(PathBuf::from(DEFAULT_STARTUP_FILE)),
            root_dir: None,
        }
    }
}

impl ConfigPaths {
    /// Explicit startup file, resolved against cwd, exe dir and `root_dir` when relative.
    #[inline]
    pub fn new<P>(startup: P, root_dir: Option<PathBuf>) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            startup: Some(startup.into()),
            root_dir,
        }
    }

    /// No startup file at all: defaults, env and programmatic layers only.
    #[inline]
    pub fn none() -> Self {
        Self {
            startup: None,
            root_dir: None,
        }
    }

    #[inline]
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    #[inline]
    pub fn startup_path(&self) -> Option<&Path> {
        self.startup.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StartupConfigSource {
    #[default]
    Defaults,
    File {
        path: PathBuf,
    },
    Mixed,
}

/// Normalized startup configuration.
/// All fields have concrete defaults; only the state dir stays optional because its
/// absence selects the environment fallback chain.
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub source: StartupConfigSource,

    pub product_name: String,

    pub assets_root: PathBuf,
    pub splash_asset: PathBuf,

    pub state_dir: Option<PathBuf>,

    pub log_file: bool,
    pub log_filter: String,
    pub log_colors: bool,

    pub battery_min_seconds: i64,
    pub battery_min_percent: i32,

    pub quit_is_benign: bool,
}

impl Default for StartupConfig {
    #[inline]
    fn default() -> Self {
        Self {
            source: StartupConfigSource::Defaults,

            product_name: "Gake".to_owned(),

            assets_root: PathBuf::from(DEFAULT_ASSETS_ROOT),
            splash_asset: PathBuf::from("Log_Splashes.txt"),

            state_dir: None,

            log_file: true,
            log_filter: "info".to_owned(),
            log_colors: true,

            battery_min_seconds: 900,
            battery_min_percent: 15,

            quit_is_benign: true,
        }
    }
}

impl StartupConfig {
    #[inline]
    pub fn splash_path(&self) -> PathBuf {
        self.assets_root.join(&self.splash_asset)
    }

    /// Resolves the state dir on every call; the environment may change between setup and a crash.
    #[inline]
    pub fn resolve_state_dir(&self) -> StateDir {
        resolve_state_dir(self.state_dir.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupOverrideSource {
    File,
    Env,
    Programmatic,
}

#[derive(Debug, Clone)]
pub struct StartupOverride {
    pub key: &'static str,
    pub source: StartupOverrideSource,
    pub from: String,
    pub to: String,
}

/// Sparse override layer. `None` leaves the value below untouched.
#[derive(Debug, Clone, Default)]
pub struct StartupOverrides {
    pub product_name: Option<String>,
    pub assets_root: Option<PathBuf>,
    pub splash_asset: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub log_file: Option<bool>,
    pub log_filter: Option<String>,
    pub log_colors: Option<bool>,
    pub battery_min_seconds: Option<i64>,
    pub battery_min_percent: Option<i32>,
    pub quit_is_benign: Option<bool>,
}

impl StartupOverrides {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn from_env() -> Self {
        Self::from_env_with(|k| std::env::var_os(k))
    }

    pub fn from_env_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let string = |k: &str| {
            lookup(k)
                .and_then(|v| v.into_string().ok())
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };
        let path = |k: &str| lookup(k).filter(|v| !v.is_empty()).map(PathBuf::from);

        Self {
            product_name: None,
            assets_root: path("GAKE_ASSETS_ROOT"),
            splash_asset: None,
            state_dir: path("GAKE_STATE_DIR"),
            log_file: string("GAKE_LOG_FILE").and_then(|v| parse_flag(&v)),
            log_filter: string("GAKE_LOG"),
            log_colors: string("GAKE_LOG_COLORS").and_then(|v| parse_flag(&v)),
            battery_min_seconds: None,
            battery_min_percent: None,
            quit_is_benign: string("GAKE_QUIT_BENIGN").and_then(|v| parse_flag(&v)),
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug, Clone, Default)]
pub enum StartupResolvedFrom {
    /// Path was absolute and existed.
    Absolute,
    /// Found as `cwd/<file>`.
    Cwd,
    /// Found as `exe_dir/<file>`.
    ExeDir,
    /// Found as `root_dir/<file>`.
    RootDir,
    /// No file path was provided, or nothing was found.
    #[default]
    NotProvided,
}

#[derive(Debug, Clone, Default)]
pub struct StartupLoadReport {
    pub source: StartupConfigSource,
    /// The actual file used (absolute when found).
    pub file: Option<PathBuf>,
    /// Where the file was resolved from.
    pub resolved_from: StartupResolvedFrom,
    pub overrides: Vec<StartupOverride>,
}

impl StartupLoadReport {
    #[inline]
    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    #[inline]
    pub fn is_defaults(&self) -> bool {
        matches!(self.source, StartupConfigSource::Defaults)
    }

    #[inline]
    pub fn used_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}
