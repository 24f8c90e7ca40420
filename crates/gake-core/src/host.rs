use std::io::{self, BufRead, IsTerminal};

use crate::console::console_write;

/// Answer to the crash prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrashChoice {
    /// Escape default.
    Quit,
    SaveAndQuit,
}

/// Blocking modal prompts surfaced to the player.
///
/// The GUI layer may provide its own implementation; [`ConsoleDialog`] is the fallback.
/// Implementations must not panic: the crash path calls them as its last line of defense.
pub trait Dialog: Send + Sync + 'static {
    fn warn(&self, title: &str, body: &str);

    fn ask_save_report(&self, title: &str, body: &str) -> CrashChoice;
}

/// Terminal-backed dialog. Writes to raw stderr, reads an answer from stdin only when it is a tty.
#[derive(Debug, Default, Clone)]
pub struct ConsoleDialog;

impl ConsoleDialog {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Dialog for ConsoleDialog {
    fn warn(&self, title: &str, body: &str) {
        console_write(format!("\x1b[1;33m== {title} ==\x1b[m\n{body}\n\n").as_bytes());
    }

    fn ask_save_report(&self, title: &str, body: &str) -> CrashChoice {
        console_write(
            format!(
                "\x1b[1;31m== {title} ==\x1b[m\n{body}\n\n[q] Nah, just quit   [s] Save crash report > "
            )
            .as_bytes(),
        );

        let stdin = io::stdin();
        if !stdin.is_terminal() {
            console_write(b"q\n");
            return CrashChoice::Quit;
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(_) => parse_choice(&line),
            Err(_) => CrashChoice::Quit,
        }
    }
}

fn parse_choice(answer: &str) -> CrashChoice {
    match answer.trim().to_ascii_lowercase().as_str() {
        "s" | "save" | "y" | "yes" => CrashChoice::SaveAndQuit,
        _ => CrashChoice::Quit,
    }
}
