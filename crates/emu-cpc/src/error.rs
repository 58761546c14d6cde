//! Error taxonomy.
//!
//! File and snapshot failures are returned to the caller. Hardware
//! anomalies (illegal port decodes, unsupported RAM configurations) never
//! surface here; they are logged and emulation carries on.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: ROM image is {size} bytes", path.display())]
    RomSize { path: PathBuf, size: usize },
    #[error("unsupported RAM size: {size}K")]
    RamSize { size: usize },
    #[error("snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("{}: {reason}", path.display())]
    Disk { path: PathBuf, reason: String },
    #[error("configuration: {0}")]
    Config(String),
    #[error("screenshot: {0}")]
    Png(#[from] png::EncodingError),
    #[error("audio dump: {0}")]
    Wav(#[from] hound::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("missing MV - SNA signature")]
    BadSignature,
    #[error("truncated: expected {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("memory dump of {kilobytes}K is not a whole number of 16K banks")]
    MemorySize { kilobytes: usize },
    #[error("memory dump of {kilobytes}K exceeds the {installed}K installed")]
    TooLarge { kilobytes: usize, installed: usize },
}
