use std::sync::Arc;

use anyhow::Context;
use log::info;

use gake_checks::StartupChecks;
use gake_core::{ConfigPaths, ConsoleDialog, CrashCause, Dialog, ShutdownToken, StartupLoader};
use gake_crash::{crash, CrashHandler};
use gake_modules_logging::{logmsg, setup_logging, Category, Priority, DEBUG_ENABLED};

fn main() -> anyhow::Result<()> {
    let (cfg, load_report) =
        StartupLoader::load_json(&ConfigPaths::default()).context("loading startup config")?;

    let dialog: Arc<dyn Dialog> = Arc::new(ConsoleDialog::new());
    let _crash = CrashHandler::install(&cfg, dialog.clone()).context("installing crash handler")?;

    let logging = setup_logging(&cfg);

    logmsg!(Priority::Info, Category::Misc, "Gake has been started!");
    logmsg!(
        Priority::Info,
        Category::Misc,
        "Version {}",
        env!("CARGO_PKG_VERSION")
    );
    if DEBUG_ENABLED {
        logmsg!(Priority::Debug, Category::Debug, "This is a DEBUG build of Gake.");
    }

    match load_report.used_file() {
        Some(path) => info!(target: "env", "startup config: {}", path.display()),
        None => info!(target: "env", "startup config: built-in defaults"),
    }
    for o in &load_report.overrides {
        info!(
            target: "env",
            "config override {} ({:?}): {} -> {}",
            o.key,
            o.source,
            o.from,
            o.to
        );
    }
    if let Some(path) = logging.file_path() {
        info!(target: "logging", "logging to {}", path.display());
    }

    let outcome = StartupChecks::from_config(&cfg, dialog.as_ref()).run_checks();
    if let Some(cause) = outcome.crash_cause() {
        match cause {
            CrashCause::AssetsInvalid => crash!(cause, "See the game log for details."),
            _ => crash!(cause, "No other details."),
        }
    }

    logmsg!(Priority::Info, Category::Misc, "Startup checks passed ({outcome:?}).");

    if ShutdownToken::is_requested() {
        logmsg!(Priority::Notice, Category::Misc, "Interrupted during startup; quitting.");
    }

    drop(logging);
    Ok(())
}
