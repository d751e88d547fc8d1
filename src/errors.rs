//! Failure taxonomy for a backup run.
//!
//! Fatal variants map to distinct process exit codes; rotation delete
//! failures are deliberately absent here — they are collected in the run
//! report and never abort a run that already produced a valid backup.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    /// Bad configuration value or an output directory that cannot be
    /// created/written. No side effects have been attempted.
    #[error("configuration error: {0}")]
    Config(String),

    /// The source database file does not exist. No side effects.
    #[error("source database not found: {}", .0.display())]
    SourceNotFound(PathBuf),

    /// The busy-wait ceiling was exhausted while the source was locked.
    /// No artifact is left at the final name.
    #[error("timed out after {} ms waiting for database lock", .0.as_millis())]
    LockTimeout(Duration),

    /// The online copy failed partway. The temporary file is cleaned up
    /// and the final artifact name never appears.
    #[error("online copy failed: {0}")]
    CopyFailed(#[from] rusqlite::Error),

    /// Compressing the snapshot failed. The partial compressed file is
    /// removed; the uncompressed artifact is preserved for retry.
    #[error("compression failed: {0}")]
    CompressionFailed(#[source] std::io::Error),

    /// Another run holds the output-directory lock.
    #[error("another backup run holds the lock on {}", .0.display())]
    LockHeld(PathBuf),

    /// Filesystem error outside the copy/compress steps (rename, listing).
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackupError {
    /// Process exit code for this failure. Success is 0; codes here are
    /// stable so schedulers can tell failure classes apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            BackupError::Config(_) => 2,
            BackupError::SourceNotFound(_) => 3,
            BackupError::LockTimeout(_) => 4,
            BackupError::CopyFailed(_) => 5,
            BackupError::CompressionFailed(_) => 6,
            BackupError::LockHeld(_) => 7,
            BackupError::Io(_) => 8,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
