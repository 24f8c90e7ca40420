use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type GakeResult<T> = Result<T, GakeError>;

#[derive(Debug, Error)]
pub enum GakeError {
    #[error("io error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("startup config parse failed (json): path='{}' err={source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[cfg(unix)]
    #[error("signal setup failed: {0}")]
    Signal(#[from] nix::Error),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("{0}")]
    Other(String),
}

impl GakeError {
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
