//! Centralized configuration for sqlsnap.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups;
//!   no other module reads the environment.
//! - from_env() reads the SQLSNAP_* variables once at process start and
//!   fails fast on malformed values (a scheduler must not discover a bad
//!   retention count only after a snapshot was taken).
//! - Fluent with_* setters so tests and the CLI can override fields.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::BackupError;

pub const DEFAULT_DB_PATH: &str = "/var/lib/sqlsnap/data.db";
pub const DEFAULT_OUT_DIR: &str = "/var/lib/sqlsnap/backups";
pub const DEFAULT_KEEP: usize = 30;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// Top-level configuration for a backup run.
#[derive(Clone, Debug)]
pub struct BackupConfig {
    /// Path to the live source database.
    /// Env: SQLSNAP_DB
    pub db_path: PathBuf,

    /// Directory the compressed backups land in (created if missing).
    /// Env: SQLSNAP_OUT_DIR
    pub out_dir: PathBuf,

    /// Retention count: how many compressed backups survive rotation.
    /// Env: SQLSNAP_KEEP (non-negative integer, default 30)
    pub keep: usize,

    /// Ceiling for waiting out a lock on the source database.
    /// Env: SQLSNAP_BUSY_TIMEOUT_MS (default 30000)
    pub busy_timeout: Duration,

    /// Gzip level for the compressed backup (0..=9).
    /// Env: SQLSNAP_GZIP_LEVEL (default 6 — moderate, not maximum)
    pub gzip_level: u32,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            keep: DEFAULT_KEEP,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            gzip_level: DEFAULT_GZIP_LEVEL,
        }
    }
}

impl BackupConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset variables fall back to defaults; set-but-malformed variables
    /// are a hard `Config` error, not a silent fallback.
    pub fn from_env() -> Result<Self, BackupError> {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("SQLSNAP_DB") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.db_path = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("SQLSNAP_OUT_DIR") {
            let s = v.trim();
            if !s.is_empty() {
                cfg.out_dir = PathBuf::from(s);
            }
        }

        if let Ok(v) = std::env::var("SQLSNAP_KEEP") {
            cfg.keep = v.trim().parse::<usize>().map_err(|_| {
                BackupError::Config(format!(
                    "SQLSNAP_KEEP='{}' is not a non-negative integer",
                    v
                ))
            })?;
        }

        if let Ok(v) = std::env::var("SQLSNAP_BUSY_TIMEOUT_MS") {
            let ms = v.trim().parse::<u64>().map_err(|_| {
                BackupError::Config(format!(
                    "SQLSNAP_BUSY_TIMEOUT_MS='{}' is not a non-negative integer",
                    v
                ))
            })?;
            cfg.busy_timeout = Duration::from_millis(ms);
        }

        if let Ok(v) = std::env::var("SQLSNAP_GZIP_LEVEL") {
            let lvl = v.trim().parse::<u32>().ok().filter(|l| *l <= 9);
            cfg.gzip_level = lvl.ok_or_else(|| {
                BackupError::Config(format!("SQLSNAP_GZIP_LEVEL='{}' is not in 0..=9", v))
            })?;
        }

        Ok(cfg)
    }

    /// Fluent setters (builder-style) to override specific fields.

    pub fn with_db_path<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.db_path = p.into();
        self
    }

    pub fn with_out_dir<P: Into<PathBuf>>(mut self, p: P) -> Self {
        self.out_dir = p.into();
        self
    }

    pub fn with_keep(mut self, n: usize) -> Self {
        self.keep = n;
        self
    }

    pub fn with_busy_timeout(mut self, d: Duration) -> Self {
        self.busy_timeout = d;
        self
    }

    pub fn with_gzip_level(mut self, level: u32) -> Self {
        self.gzip_level = level;
        self
    }

    /// File name of the source database ("data.db" for ".../data.db").
    /// Backup names are derived from it, so unrelated files sharing the
    /// output directory are never touched by rotation.
    pub fn db_file_name(&self) -> Result<String, BackupError> {
        self.db_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                BackupError::Config(format!(
                    "db path has no file name: {}",
                    self.db_path.display()
                ))
            })
    }
}

impl fmt::Display for BackupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BackupConfig {{ db_path: {}, out_dir: {}, keep: {}, busy_timeout_ms: {}, gzip_level: {} }}",
            self.db_path.display(),
            self.out_dir.display(),
            self.keep,
            self.busy_timeout.as_millis(),
            self.gzip_level,
        )
    }
}
