use std::fmt;

/// Debug records exist only in builds with the `debug-log` feature.
pub const DEBUG_ENABLED: bool = cfg!(feature = "debug-log");

/// ANSI colors
const RESET: &str = "\x1b[m";
const GREEN: &str = "\x1b[32m";
const WHITE: &str = "\x1b[37m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

/// Highlight used for the startup splash.
pub const HIGHLIGHT: &str = "\x1b[38;2;255;255;128m";
pub const HIGHLIGHT_END: &str = RESET;

/// There is deliberately no `Critical`: the only way to log a critical error is to crash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

impl Priority {
    #[inline]
    pub const fn is_enabled(self) -> bool {
        !matches!(self, Priority::Debug) || DEBUG_ENABLED
    }

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Priority::Debug => "DEBUG",
            Priority::Info => "INFO",
            Priority::Notice => "NOTICE",
            Priority::Warning => "WARNING",
            Priority::Error => "ERROR",
        }
    }

    #[inline]
    fn color(self) -> &'static str {
        match self {
            Priority::Debug => GREEN,
            Priority::Info => WHITE,
            Priority::Notice => CYAN,
            Priority::Warning => YELLOW,
            Priority::Error => RED,
        }
    }

    /// Tag as it appears in a log line.
    pub(crate) fn write_tag(self, out: &mut impl fmt::Write, colors: bool) -> fmt::Result {
        if colors {
            write!(out, "{}{}{}", self.color(), self.label(), RESET)
        } else {
            out.write_str(self.label())
        }
    }
}

/// Log categories. More will prove necessary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Category {
    Misc,
    Debug,
    Environment,
    Checks,
    Api,
    ApiProgram,
    Crash,
    Logging,
}

impl Category {
    pub fn name(self) -> &'static str {
        match self {
            Category::Misc => "Miscellaneous",
            Category::Debug => "Debugging systems",
            Category::Environment => "Host environment",
            Category::Checks => "Startup checks",
            Category::Api => "API",
            Category::ApiProgram => "API program",
            Category::Crash => "Crash handler",
            Category::Logging => "Logging",
        }
    }

    /// Maps a `log` target (explicit `target:` or module path) to a category.
    pub fn from_target(target: &str) -> Self {
        let head = target.split("::").next().unwrap_or(target);
        match head {
            "checks" | "gake_checks" | "power" | "assets" => Category::Checks,
            "crash" | "gake_crash" => Category::Crash,
            "env" | "environment" => Category::Environment,
            "api" => Category::Api,
            "api_program" => Category::ApiProgram,
            "logging" | "gake_modules_logging" => Category::Logging,
            "debug" => Category::Debug,
            _ => Category::Misc,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<log::Level> for Priority {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Priority::Error,
            log::Level::Warn => Priority::Warning,
            log::Level::Info => Priority::Info,
            log::Level::Debug | log::Level::Trace => Priority::Debug,
        }
    }
}
