use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use gake_modules_logging::{logmsg, Category, Priority};
use thiserror::Error;

use crate::registry::{AssetDescriptor, AssetDigest};

/// Why a single asset failed verification.
#[derive(Debug, Error)]
pub enum AssetFailure {
    #[error("File {} does not exist.", path.display())]
    Missing { path: PathBuf },

    #[error("File {} could not be read: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Expected file {} to have size {expected}, but got size {actual}.", path.display())]
    SizeMismatch {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("Expected file {} to have digest {expected}, but got digest {actual}.", path.display())]
    DigestMismatch {
        path: PathBuf,
        expected: AssetDigest,
        actual: AssetDigest,
    },
}

impl AssetFailure {
    pub fn path(&self) -> &Path {
        match self {
            AssetFailure::Missing { path }
            | AssetFailure::Unreadable { path, .. }
            | AssetFailure::SizeMismatch { path, .. }
            | AssetFailure::DigestMismatch { path, .. } => path,
        }
    }
}

/// Checks one asset under `root`: existence, then exact size, then digest.
pub fn verify_asset(root: &Path, desc: &AssetDescriptor) -> Result<(), AssetFailure> {
    let path = root.join(desc.path);

    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(AssetFailure::Missing { path });
        }
        Err(source) => return Err(AssetFailure::Unreadable { path, source }),
    };

    // One byte past the expected size is enough to tell "too long" apart from "exact".
    let mut buf = Vec::with_capacity(desc.size as usize + 1);
    let mut limited = file.take(desc.size.saturating_add(1));
    if let Err(source) = limited.read_to_end(&mut buf) {
        return Err(AssetFailure::Unreadable { path, source });
    }

    let read = buf.len() as u64;
    if read != desc.size {
        let actual = if read > desc.size {
            limited
                .into_inner()
                .metadata()
                .map(|m| m.len())
                .unwrap_or(read)
        } else {
            read
        };
        return Err(AssetFailure::SizeMismatch {
            path,
            expected: desc.size,
            actual,
        });
    }

    let actual = AssetDigest::of(&buf);
    if actual != desc.digest {
        return Err(AssetFailure::DigestMismatch {
            path,
            expected: desc.digest,
            actual,
        });
    }

    Ok(())
}

#[derive(Debug, Default)]
pub struct VerificationReport {
    pub checked: usize,
    pub failures: Vec<AssetFailure>,
}

impl VerificationReport {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Verifies every descriptor, logging each failure. Never stops at the first broken asset.
pub fn verify_all(root: &Path, registry: &[AssetDescriptor]) -> VerificationReport {
    logmsg!(Priority::Debug, Category::Checks, "Verifying assets…");

    let mut report = VerificationReport::default();
    for desc in registry {
        logmsg!(
            Priority::Debug,
            Category::Checks,
            "Testing asset {}…",
            root.join(desc.path).display()
        );

        report.checked += 1;
        if let Err(failure) = verify_asset(root, desc) {
            logmsg!(Priority::Error, Category::Checks, "{failure}");
            report.failures.push(failure);
        }
    }

    if report.is_ok() {
        logmsg!(Priority::Info, Category::Checks, "All assets have been verified!");
    }
    report
}
