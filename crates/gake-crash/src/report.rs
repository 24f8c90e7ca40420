use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use gake_core::{file_timestamp, CrashCause, GakeError, GakeResult};

/// The one report a crashing process produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrashReport {
    pub product: String,
    pub cause: CrashCause,
    /// Detail supplied by the code that raised the crash.
    pub detail: String,
    /// Sub-code and fault address, when a signal triggered the crash.
    pub signal_detail: Option<String>,
    pub at: DateTime<Local>,
}

impl CrashReport {
    pub fn new(
        product: impl Into<String>,
        cause: CrashCause,
        detail: impl Into<String>,
        signal_detail: Option<String>,
    ) -> Self {
        Self {
            product: product.into(),
            cause,
            detail: detail.into(),
            signal_detail,
            at: Local::now(),
        }
    }

    #[inline]
    pub fn exit_code(&self) -> i32 {
        self.cause.exit_code()
    }

    pub fn title(&self) -> String {
        format!("{} Crash Handler", self.product)
    }

    fn detail_or_default(&self) -> &str {
        if self.detail.is_empty() {
            "No other details."
        } else {
            &self.detail
        }
    }

    /// Colored console rendition.
    pub fn console_text(&self) -> String {
        let mut out = format!(
            "[{}] \x1b[41;1mCRITICAL:\x1b[m\x1b[31;1m {} has crashed!  Error code: {}, which means:\n\n{}\n\n",
            self.at.format("%H:%M:%S"),
            self.product,
            self.cause,
            self.cause.explanation(),
        );
        if let Some(sig) = &self.signal_detail {
            out.push_str(&format!("Signal info:\n\n{sig}\n\n"));
        }
        out.push_str(&format!(
            "Additional info:\n\n{}\n\nQuitting now…\n\x1b[m",
            self.detail_or_default()
        ));
        out
    }

    /// Plain-text report, as saved to disk.
    pub fn body(&self) -> String {
        let mut out = format!(
            "{} has crashed!\n\nExit code:  {}\nwhich means:  {}\n\n",
            self.product,
            self.cause,
            self.cause.explanation(),
        );
        if let Some(sig) = &self.signal_detail {
            out.push_str(&format!("Signal information:  {sig}\n\n"));
        }
        out.push_str(&format!(
            "Additional information:  {}\n\nCrash occurred at {}.\n",
            self.detail_or_default(),
            self.at.format("%Y-%m-%d %H:%M:%S"),
        ));
        out
    }

    /// Body plus the save question, for the dialog.
    pub fn prompt(&self) -> String {
        format!("{}\nWould you like to save this crash report?", self.body())
    }

    /// Writes [`body`](Self::body) to `<dir>/<timestamp>.txt`, creating `dir` if needed.
    pub fn save(&self, dir: &Path) -> GakeResult<PathBuf> {
        fs::create_dir_all(dir).map_err(|e| GakeError::io(dir, e))?;

        let stamp = file_timestamp(&self.at);
        let (mut file, path) = create_fresh(dir, &stamp)?;
        file.write_all(self.body().as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| GakeError::io(&path, e))?;
        Ok(path)
    }
}

fn create_fresh(dir: &Path, stamp: &str) -> GakeResult<(File, PathBuf)> {
    let primary = dir.join(format!("{stamp}.txt"));
    match OpenOptions::new().write(true).create_new(true).open(&primary) {
        Ok(f) => Ok((f, primary)),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            let alt = dir.join(format!("{stamp}_{}.txt", std::process::id()));
            let f = OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&alt)
                .map_err(|e| GakeError::io(&alt, e))?;
            Ok((f, alt))
        }
        Err(e) => Err(GakeError::io(primary, e)),
    }
}
