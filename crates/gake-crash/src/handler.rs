use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::thread;

use gake_core::{
    console_write, ConsoleDialog, CrashCause, CrashChoice, Dialog, GakeError, GakeResult,
    StartupConfig,
};
use gake_modules_logging::{try_halt_logging, try_log_args, Category, Priority};

use crate::report::CrashReport;
use crate::request::{CrashRequest, REQUEST};

#[cfg(unix)]
use crate::signals::{self, SignalEvent};
#[cfg(unix)]
use nix::sys::signal::Signal;

/// Name of the thread that builds reports after a signal.
pub const WATCHER_THREAD: &str = "gake-crash-watcher";

static REPORTER: OnceLock<Arc<CrashReporter>> = OnceLock::new();

/// How the process ends once the report is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Exit(i32),
    /// Restore the default action and raise the signal again.
    #[cfg(unix)]
    Reraise(Signal),
}

/// Builds, shows and optionally saves crash reports.
pub struct CrashReporter {
    product: String,
    reports_dir: PathBuf,
    dialog: Arc<dyn Dialog>,
}

impl CrashReporter {
    pub fn new(product: impl Into<String>, reports_dir: PathBuf, dialog: Arc<dyn Dialog>) -> Self {
        Self {
            product: product.into(),
            reports_dir,
            dialog,
        }
    }

    /// Report directory resolved the same way the logger resolves its state directory.
    pub fn from_config(cfg: &StartupConfig, dialog: Arc<dyn Dialog>) -> Self {
        let reports_dir = cfg.resolve_state_dir().crash_reports_dir(&cfg.product_name);
        Self::new(cfg.product_name.clone(), reports_dir, dialog)
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Report for a captured signal. The crash-request signal picks up the recorded request.
    #[cfg(unix)]
    pub fn report_for(&self, event: SignalEvent) -> CrashReport {
        if event.is_crash_request() {
            return match REQUEST.try_take() {
                Some(req) => self.report_for_request(req),
                None => CrashReport::new(
                    &self.product,
                    CrashCause::Unknown,
                    "",
                    Some(event.describe()),
                ),
            };
        }
        CrashReport::new(&self.product, event.cause(), "", Some(event.describe()))
    }

    pub fn report_for_request(&self, req: CrashRequest) -> CrashReport {
        CrashReport::new(&self.product, req.cause, req.detail, None)
    }

    /// Signal entry point on the watcher thread.
    #[cfg(unix)]
    pub fn handle(&self, event: SignalEvent) -> Disposition {
        let report = self.report_for(event);
        let disposition = self.process(&report);

        // The crash signal only carries an explicit request; those always exit with their code.
        if event.is_crash_request() {
            Disposition::Exit(report.exit_code())
        } else {
            disposition
        }
    }

    /// Console, log, prompt, optional save, log teardown. Never fails.
    ///
    /// Console output bypasses the std `Stderr` lock: the interrupted thread may be holding it.
    pub fn process(&self, report: &CrashReport) -> Disposition {
        console_write(report.console_text().as_bytes());

        let _ = try_log_args(
            Priority::Error,
            Category::Crash,
            format_args!(
                "{} has crashed with code {}: {}",
                report.product,
                report.cause,
                report.cause.explanation()
            ),
        );

        let choice = self.dialog.ask_save_report(&report.title(), &report.prompt());
        if choice == CrashChoice::SaveAndQuit {
            match report.save(&self.reports_dir) {
                Ok(path) => {
                    console_write(format!("Crash report saved to {}.\n", path.display()).as_bytes());
                    let _ = try_log_args(
                        Priority::Notice,
                        Category::Crash,
                        format_args!("Crash report saved to {}.", path.display()),
                    );
                }
                Err(e) => {
                    console_write(
                        format!("\x1b[33mCould not save the crash report: {e}\x1b[m\n").as_bytes(),
                    );
                    let _ = try_log_args(
                        Priority::Warning,
                        Category::Crash,
                        format_args!("Could not save the crash report: {e}"),
                    );
                }
            }
        }

        let _ = try_halt_logging();
        disposition_for(report.cause)
    }
}

fn disposition_for(cause: CrashCause) -> Disposition {
    #[cfg(unix)]
    {
        let sig = match cause {
            CrashCause::Abort => Some(Signal::SIGABRT),
            CrashCause::BusError => Some(Signal::SIGBUS),
            CrashCause::FloatingPointException => Some(Signal::SIGFPE),
            CrashCause::Hangup => Some(Signal::SIGHUP),
            CrashCause::IllegalInstruction => Some(Signal::SIGILL),
            CrashCause::SegmentationFault => Some(Signal::SIGSEGV),
            CrashCause::Terminated => Some(Signal::SIGTERM),
            CrashCause::BadSyscall => Some(Signal::SIGSYS),
            _ => None,
        };
        if let Some(sig) = sig.filter(|_| cause.reraises_default()) {
            return Disposition::Reraise(sig);
        }
    }
    Disposition::Exit(cause.exit_code())
}

/// Ends the process.
pub fn terminate(disposition: Disposition) -> ! {
    match disposition {
        Disposition::Exit(code) => std::process::exit(code),
        #[cfg(unix)]
        Disposition::Reraise(sig) => {
            use nix::sys::signal::{pthread_sigmask, raise, SigSet, SigmaskHow};

            let _ = signals::restore_default(sig);
            let mut only = SigSet::empty();
            only.add(sig);
            let _ = pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&only), None);
            let _ = raise(sig);
            // Still alive: the default action was overridden elsewhere.
            std::process::abort()
        }
    }
}

/// Process-wide crash handler.
pub struct CrashHandler {
    reporter: Arc<CrashReporter>,
}

impl CrashHandler {
    /// Installs signal handlers, the watcher thread and the panic hook. Once per process.
    pub fn install(cfg: &StartupConfig, dialog: Arc<dyn Dialog>) -> GakeResult<Self> {
        let reporter = Arc::new(CrashReporter::from_config(cfg, dialog));
        REPORTER
            .set(reporter.clone())
            .map_err(|_| GakeError::Other("crash handler is already installed".into()))?;

        #[cfg(unix)]
        spawn_watcher(reporter.clone(), cfg.quit_is_benign)?;
        install_panic_hook();

        Ok(Self { reporter })
    }

    pub fn reporter(&self) -> &CrashReporter {
        &self.reporter
    }

    /// True once signals are routed to the watcher.
    pub fn is_armed() -> bool {
        #[cfg(unix)]
        {
            signals::is_armed()
        }
        #[cfg(not(unix))]
        {
            false
        }
    }
}

#[cfg(unix)]
fn spawn_watcher(reporter: Arc<CrashReporter>, quit_is_benign: bool) -> GakeResult<()> {
    use std::os::fd::IntoRawFd;
    use std::os::unix::net::UnixStream;

    use nix::sys::signal::{pthread_sigmask, SigSet, SigmaskHow};

    let (rx, tx) = UnixStream::pair().map_err(|e| GakeError::Other(e.to_string()))?;

    // The watcher inherits a mask with every handled signal blocked.
    let mut previous = SigSet::empty();
    pthread_sigmask(
        SigmaskHow::SIG_BLOCK,
        Some(&signals::handled_set()),
        Some(&mut previous),
    )?;
    let spawned = thread::Builder::new()
        .name(WATCHER_THREAD.into())
        .spawn(move || watch(rx, reporter));
    pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&previous), None)?;
    spawned.map_err(|e| GakeError::Other(format!("failed to spawn crash watcher: {e}")))?;

    // The write end stays open for the rest of the process.
    signals::install(tx.into_raw_fd(), quit_is_benign)
}

#[cfg(unix)]
fn watch(mut rx: std::os::unix::net::UnixStream, reporter: Arc<CrashReporter>) {
    let mut byte = [0u8; 1];
    loop {
        match rx.read(&mut byte) {
            Ok(0) => return,
            Ok(_) => {
                let disposition = reporter.handle(SignalEvent::pending());
                terminate(disposition);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => return,
        }
    }
}

fn on_watcher_thread() -> bool {
    thread::current().name() == Some(WATCHER_THREAD)
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if on_watcher_thread() {
            previous(info);
            std::process::abort();
        }
        raise_crash(CrashCause::TechnicalFailure, format_args!("{info}"));
    }));
}

/// Records `cause` and `args`, then takes the same path as an OS fault. Never returns.
pub fn raise_crash(cause: CrashCause, args: fmt::Arguments<'_>) -> ! {
    REQUEST.record(CrashRequest::new(cause, args));

    if on_watcher_thread() {
        console_write(
            format!("Crash {cause} requested while a crash report was in progress.\n").as_bytes(),
        );
        std::process::abort();
    }

    #[cfg(unix)]
    {
        if signals::is_armed() {
            let _ = nix::sys::signal::raise(signals::CRASH_SIGNAL);
            loop {
                thread::park();
            }
        }
    }

    // Not armed: report on this thread.
    let reporter = match REPORTER.get() {
        Some(r) => r.clone(),
        None => Arc::new(CrashReporter::from_config(
            &StartupConfig::default(),
            Arc::new(ConsoleDialog::new()),
        )),
    };
    let report = match REQUEST.take() {
        Some(req) => reporter.report_for_request(req),
        None => CrashReport::new(&reporter.product, cause, "", None),
    };
    reporter.process(&report);
    terminate(Disposition::Exit(report.exit_code()))
}

/// `crash!(cause, "fmt", args...)`: shorthand for [`raise_crash`].
#[macro_export]
macro_rules! crash {
    ($cause:expr, $($arg:tt)+) => {
        $crate::raise_crash($cause, ::core::format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use super::*;

    struct ScriptedDialog {
        choice: CrashChoice,
        asked: Mutex<Vec<String>>,
    }

    impl ScriptedDialog {
        fn new(choice: CrashChoice) -> Arc<Self> {
            Arc::new(Self {
                choice,
                asked: Mutex::new(Vec::new()),
            })
        }
    }

    impl Dialog for ScriptedDialog {
        fn warn(&self, _title: &str, _body: &str) {}

        fn ask_save_report(&self, title: &str, body: &str) -> CrashChoice {
            self.asked.lock().unwrap().push(format!("{title}\n{body}"));
            self.choice
        }
    }

    #[test]
    fn explicit_crash_exits_with_cause_code() {
        let dir = TempDir::new().unwrap();
        let dialog = ScriptedDialog::new(CrashChoice::Quit);
        let reporter = CrashReporter::new("Gake", dir.path().join("reports"), dialog.clone());

        let report = reporter.report_for_request(CrashRequest::new(
            CrashCause::AssetsInvalid,
            format_args!("See the game log for details."),
        ));
        assert_eq!(reporter.process(&report), Disposition::Exit(0x0C));

        let asked = dialog.asked.lock().unwrap();
        assert_eq!(asked.len(), 1);
        assert!(asked[0].starts_with("Gake Crash Handler"));
        assert!(asked[0].contains("See the game log for details."));
        assert!(!dir.path().join("reports").exists());
    }

    #[test]
    fn save_choice_writes_report() {
        let dir = TempDir::new().unwrap();
        let reports = dir.path().join("Gake").join("Crash_Reports");
        let reporter =
            CrashReporter::new("Gake", reports.clone(), ScriptedDialog::new(CrashChoice::SaveAndQuit));

        let report = CrashReport::new("Gake", CrashCause::BatteryInsufficient, "No other details.", None);
        assert_eq!(reporter.process(&report), Disposition::Exit(0x0D));

        let saved: Vec<_> = fs::read_dir(&reports).unwrap().collect();
        assert_eq!(saved.len(), 1);
        let text = fs::read_to_string(saved[0].as_ref().unwrap().path()).unwrap();
        assert_eq!(text, report.body());
    }

    #[test]
    fn unwritable_report_dir_still_terminates() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();
        let reporter = CrashReporter::new(
            "Gake",
            blocker.join("Crash_Reports"),
            ScriptedDialog::new(CrashChoice::SaveAndQuit),
        );

        let report = CrashReport::new("Gake", CrashCause::Terminated, "", None);
        assert_eq!(reporter.process(&report), Disposition::Exit(0x0A));
    }

    #[cfg(unix)]
    #[test]
    fn os_faults_reraise_and_requests_exit() {
        let reporter = CrashReporter::new(
            "Gake",
            PathBuf::from("/nonexistent"),
            ScriptedDialog::new(CrashChoice::Quit),
        );

        let segv = SignalEvent::new(libc::SIGSEGV, 1, 0xdead);
        assert_eq!(reporter.handle(segv), Disposition::Reraise(Signal::SIGSEGV));

        let term = SignalEvent::new(libc::SIGTERM, 0, 0);
        assert_eq!(reporter.handle(term), Disposition::Reraise(Signal::SIGTERM));

        let hup = SignalEvent::new(libc::SIGHUP, 0, 0);
        assert_eq!(reporter.handle(hup), Disposition::Reraise(Signal::SIGHUP));

        let quit = SignalEvent::new(libc::SIGQUIT, 0, 0);
        assert_eq!(reporter.handle(quit), Disposition::Exit(0x08));
    }

    #[cfg(unix)]
    #[test]
    fn crash_signal_uses_recorded_request() {
        let reporter = CrashReporter::new(
            "Gake",
            PathBuf::from("/nonexistent"),
            ScriptedDialog::new(CrashChoice::Quit),
        );

        crate::record_crash_request(CrashCause::AssetsInvalid, format_args!("first"));
        crate::record_crash_request(CrashCause::BatteryInsufficient, format_args!("second"));

        let event = SignalEvent::new(libc::SIGUSR1, 0, 0);
        let report = reporter.report_for(event);
        assert_eq!(report.cause, CrashCause::BatteryInsufficient);
        assert_eq!(report.detail, "second");
        assert_eq!(reporter.process(&report), Disposition::Exit(0x0D));

        // Without a request, the crash signal is an unknown cause.
        let report = reporter.report_for(event);
        assert_eq!(report.cause, CrashCause::Unknown);
    }
}
