use std::fmt::{self, Write as _};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use flate2::write::GzEncoder;
use flate2::Compression;
use gake_core::{file_timestamp, RawStderr, StartupConfig, StateDir};

use crate::bounded::{render_bounded, BoundedBuf, MAX_LINE_LEN, MAX_MESSAGE_LEN};
use crate::escape::strip_escapes;
use crate::priority::{Category, Priority};

/// Persistent destination for the escape-stripped copy of every record.
pub trait Sink: Write + Send {
    /// Completes the sink. Called once, at teardown.
    fn finish(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

/// Gzip-compressed log file, one per run.
pub struct GzipSink {
    path: PathBuf,
    encoder: GzEncoder<File>,
}

impl GzipSink {
    /// Creates `<dir>/<timestamp>.txt.gz`. Never reuses an existing file.
    pub fn create(dir: &Path, at: &DateTime<Local>) -> io::Result<Self> {
        let stamp = file_timestamp(at);
        let primary = dir.join(format!("{stamp}.txt.gz"));

        let (file, path) = match OpenOptions::new().write(true).create_new(true).open(&primary) {
            Ok(f) => (f, primary),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let alt = dir.join(format!("{stamp}_{}.txt.gz", std::process::id()));
                let f = OpenOptions::new().write(true).create_new(true).open(&alt)?;
                (f, alt)
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            path,
            encoder: GzEncoder::new(file, Compression::default()),
        })
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Write for GzipSink {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.encoder.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> io::Result<()> {
        self.encoder.flush()
    }
}

impl Sink for GzipSink {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut file = self.encoder.finish()?;
        file.flush()
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Color escapes on the console copy. The file copy is always stripped.
    pub colors: bool,
}

impl Default for LoggerConfig {
    #[inline]
    fn default() -> Self {
        Self { colors: true }
    }
}

impl LoggerConfig {
    #[inline]
    pub fn from_startup(cfg: &StartupConfig) -> Self {
        Self {
            colors: cfg.log_colors,
        }
    }
}

/// Leveled, categorized logger with a console sink and an optional persistent sink.
pub struct Logger {
    config: LoggerConfig,
    console: Box<dyn Write + Send>,
    file: Option<Box<dyn Sink>>,
    file_path: Option<PathBuf>,
}

impl Logger {
    /// Builds a logger over explicit sinks.
    pub fn with_sinks(
        config: LoggerConfig,
        console: Box<dyn Write + Send>,
        file: Option<Box<dyn Sink>>,
    ) -> Self {
        Self {
            config,
            console,
            file,
            file_path: None,
        }
    }

    /// Console on stderr, compressed file under the resolved state dir.
    #[inline]
    pub fn open(cfg: &StartupConfig) -> Self {
        Self::open_with_console(cfg, Box::new(RawStderr))
    }

    /// Opens the persistent sink as described by `cfg`.
    ///
    /// Nothing in here can fail the caller: every I/O problem is reported on the console and the
    /// logger degrades to console-only.
    pub fn open_with_console(cfg: &StartupConfig, console: Box<dyn Write + Send>) -> Self {
        let mut logger = Self::with_sinks(LoggerConfig::from_startup(cfg), console, None);

        if !cfg.log_file {
            return logger;
        }

        let state = cfg.resolve_state_dir();
        if state.source.is_fallback() {
            logger.log(
                Priority::Notice,
                Category::Logging,
                format_args!(
                    "An appropriate location for a log file could not be found.  Please make sure \
                     that either $HOME or $XDG_STATE_HOME is set.  Falling back to '{}'.",
                    state.path.display()
                ),
            );
        }

        match open_file_sink(&state, &cfg.product_name) {
            Ok(sink) => {
                logger.file_path = Some(sink.path().to_path_buf());
                logger.file = Some(Box::new(sink));
            }
            Err((path, e)) => {
                logger.log(
                    Priority::Warning,
                    Category::Logging,
                    format_args!(
                        "Could not open a log file in '{}': {e}.  Logging to the console only.",
                        path.display()
                    ),
                );
            }
        }

        logger
    }

    #[inline]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    #[inline]
    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }

    pub fn log(&mut self, priority: Priority, category: Category, args: fmt::Arguments<'_>) {
        if !priority.is_enabled() {
            return;
        }

        let line = render_line(&Local::now(), priority, category, args, true);
        let mut bytes = line.into_bytes();

        let written = if self.config.colors {
            self.console.write_all(&bytes)
        } else {
            let mut plain = bytes.clone();
            strip_escapes(&mut plain);
            self.console.write_all(&plain)
        };
        let _ = written.and_then(|()| self.console.flush());

        let Some(file) = self.file.as_mut() else {
            return;
        };

        strip_escapes(&mut bytes);
        // Flushed per record: a crash right after this call must still find the line on disk.
        if let Err(e) = file.write_all(&bytes).and_then(|()| file.flush()) {
            self.file = None;
            let _ = writeln!(
                self.console,
                "Log file write failed ({e}); continuing with console logging only."
            );
        }
    }

    /// Releases the persistent sink.
    pub fn close(mut self) -> io::Result<()> {
        let _ = self.console.flush();
        match self.file.take() {
            Some(file) => file.finish(),
            None => Ok(()),
        }
    }
}

fn open_file_sink(state: &StateDir, product: &str) -> Result<GzipSink, (PathBuf, io::Error)> {
    let dir = state.product_dir(product);
    fs::create_dir_all(&dir).map_err(|e| (dir.clone(), e))?;
    GzipSink::create(&dir, &Local::now()).map_err(|e| (dir, e))
}

/// `[HH:MM:SS] <PRIORITY> (<Category>:)  <message>\n`, bounded to [`MAX_LINE_LEN`].
pub fn render_line(
    at: &DateTime<Local>,
    priority: Priority,
    category: Category,
    args: fmt::Arguments<'_>,
    colors: bool,
) -> String {
    let msg = render_bounded(args, MAX_MESSAGE_LEN);

    // Leave room for the newline so it survives truncation.
    let mut line = BoundedBuf::new(MAX_LINE_LEN - 1);
    let _ = write!(line, "[{}] ", at.format("%H:%M:%S"));
    let _ = priority.write_tag(&mut line, colors);
    let _ = write!(line, " ({}:)  {}", category.name(), msg);

    let mut out = line.into_string();
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }

        fn is_empty(&self) -> bool {
            self.0.lock().is_empty()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink for SharedBuf {}

    fn logger(colors: bool) -> (Logger, SharedBuf, SharedBuf) {
        let console = SharedBuf::default();
        let file = SharedBuf::default();
        let logger = Logger::with_sinks(
            LoggerConfig { colors },
            Box::new(console.clone()),
            Some(Box::new(file.clone())),
        );
        (logger, console, file)
    }

    #[test]
    fn line_has_the_documented_shape() {
        let at = Local.with_ymd_and_hms(2021, 7, 4, 13, 37, 0).unwrap();
        let line = render_line(
            &at,
            Priority::Info,
            Category::Checks,
            format_args!("All assets have been verified!"),
            false,
        );
        assert_eq!(
            line,
            "[13:37:00] INFO (Startup checks:)  All assets have been verified!\n"
        );
    }

    #[test]
    fn long_line_is_bounded_and_keeps_newline() {
        let at = Local.with_ymd_and_hms(2021, 7, 4, 13, 37, 0).unwrap();
        let big = "y".repeat(4 * MAX_LINE_LEN);
        let line = render_line(&at, Priority::Error, Category::Misc, format_args!("{big}"), true);
        assert!(line.len() <= MAX_LINE_LEN);
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn console_is_colored_and_file_is_stripped() {
        let (mut logger, console, file) = logger(true);
        logger.log(Priority::Error, Category::Checks, format_args!("boom"));

        let c = console.text();
        let f = file.text();
        assert!(c.contains("\x1b[31mERROR\x1b[m"));
        assert!(!f.contains('\x1b'));
        assert!(f.contains("ERROR"));
        assert!(f.ends_with("(Startup checks:)  boom\n"));
        assert_eq!(c.len(), f.len());
    }

    #[test]
    fn console_colors_can_be_disabled() {
        let (mut logger, console, _file) = logger(false);
        logger.log(Priority::Notice, Category::Misc, format_args!("hi"));
        assert!(!console.text().contains('\x1b'));
    }

    #[cfg(not(feature = "debug-log"))]
    #[test]
    fn suppressed_debug_writes_nothing_anywhere() {
        let (mut logger, console, file) = logger(true);
        logger.log(Priority::Debug, Category::Debug, format_args!("invisible"));
        assert!(console.is_empty());
        assert!(file.is_empty());
    }

    #[test]
    fn close_without_file_is_ok() {
        let l = Logger::with_sinks(LoggerConfig::default(), Box::new(io::sink()), None);
        assert!(!l.has_file());
        l.close().unwrap();
    }
}
