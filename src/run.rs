//! One backup run end to end: snapshot -> compress -> prune.
//!
//! Runs are sequential and single-threaded; the only blocking point is
//! waiting out a lock on the source database, bounded by the configured
//! timeout. Each run adds exactly one member to the backup set and removes
//! zero or more old ones.

use std::fs;
use std::path::PathBuf;

use chrono::Local;
use log::info;
use serde::Serialize;

use crate::config::BackupConfig;
use crate::errors::{BackupError, Result};
use crate::rotate::{self, ARTIFACT_SUFFIX};
use crate::runlock::RunLock;
use crate::snapshot;

/// Timestamp embedded in backup names. Fixed width, so lexicographic
/// order of names equals chronological order.
pub const STAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Result of a successful run, for stdout/JSON reporting.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Final compressed backup.
    pub backup: PathBuf,
    /// Old backups removed by rotation.
    pub deleted: Vec<PathBuf>,
    /// Backups rotation tried but failed to remove (non-fatal).
    pub delete_failures: Vec<(PathBuf, String)>,
}

/// Execute the whole procedure described by `cfg`.
///
/// The source-exists check runs before anything else: a missing source
/// must not even create the output directory. The run lock rejects a
/// concurrent run against the same directory instead of racing it.
pub fn run_backup(cfg: &BackupConfig) -> Result<RunReport> {
    info!("run: {}", cfg);

    let db_name = cfg.db_file_name()?;
    if !cfg.db_path.exists() {
        return Err(BackupError::SourceNotFound(cfg.db_path.clone()));
    }

    fs::create_dir_all(&cfg.out_dir).map_err(|e| {
        BackupError::Config(format!(
            "cannot create output dir {}: {}",
            cfg.out_dir.display(),
            e
        ))
    })?;

    let _lock = RunLock::try_acquire(&cfg.out_dir)?;

    let stamp = Local::now().format(STAMP_FORMAT).to_string();
    let artifact = cfg
        .out_dir
        .join(format!("{}.{}{}", db_name, stamp, ARTIFACT_SUFFIX));

    snapshot::snapshot_to(&cfg.db_path, &artifact, cfg.busy_timeout)?;
    let backup = rotate::compress_artifact(&artifact, cfg.gzip_level)?;
    let outcome = rotate::prune_backups(&cfg.out_dir, &db_name, cfg.keep)?;

    info!(
        "run: done, backup={}, deleted={}, delete_failures={}",
        backup.display(),
        outcome.deleted.len(),
        outcome.failed.len()
    );

    Ok(RunReport {
        backup,
        deleted: outcome.deleted,
        delete_failures: outcome.failed,
    })
}
