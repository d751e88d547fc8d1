//! Retention Manager: compress a snapshot into the backup set and prune it.
//!
//! Backup names embed a fixed-width timestamp, so plain descending string
//! sort on file names is newest-first. Only names matching the
//! `<dbname>.<stamp>.sqlite.gz` pattern count as members of the set;
//! unrelated files sharing the directory are never touched.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::{info, warn};

use crate::errors::{BackupError, Result};

/// Suffix of a completed, uncompressed Snapshot Artifact.
pub const ARTIFACT_SUFFIX: &str = ".sqlite";

/// Suffix of a member of the Backup Set.
pub const BACKUP_SUFFIX: &str = ".sqlite.gz";

/// Stream-compress `artifact` into `<artifact>.gz` and delete the original.
///
/// Asymmetry on failure: the partial `.gz` is removed best-effort but the
/// uncompressed artifact is kept, so a retry (or an operator) still has a
/// valid snapshot to work from.
pub fn compress_artifact(artifact: &Path, level: u32) -> Result<PathBuf> {
    let gz_path = gz_path_for(artifact);

    match write_gz(artifact, &gz_path, level) {
        Ok(bytes_in) => {
            fs::remove_file(artifact)?;
            info!(
                "compress: {} ({} B) -> {}",
                artifact.display(),
                bytes_in,
                gz_path.display()
            );
            Ok(gz_path)
        }
        Err(e) => {
            let _ = fs::remove_file(&gz_path);
            Err(BackupError::CompressionFailed(e))
        }
    }
}

fn write_gz(src: &Path, dst: &Path, level: u32) -> io::Result<u64> {
    let mut input = File::open(src)?;
    let mut enc = GzEncoder::new(File::create(dst)?, Compression::new(level));
    let n = io::copy(&mut input, &mut enc)?;
    let out = enc.finish()?;
    out.sync_all()?;
    Ok(n)
}

/// What rotation did: paths removed, and paths it tried but failed to
/// remove (with the error text, for the run report).
#[derive(Debug, Default)]
pub struct PruneOutcome {
    pub deleted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

/// Delete all but the newest `keep` backups of `db_name` in `out_dir`.
///
/// Per-file deletion failures are logged, collected and skipped; one
/// undeletable old backup must not abort cleanup of the rest or fail a
/// run whose primary backup already exists.
pub fn prune_backups(out_dir: &Path, db_name: &str, keep: usize) -> Result<PruneOutcome> {
    let mut names = list_backup_names(out_dir, db_name)?;
    // Fixed-width timestamp: descending name order is newest-first.
    names.sort_unstable_by(|a, b| b.cmp(a));

    let mut outcome = PruneOutcome::default();
    for name in names.iter().skip(keep) {
        let path = out_dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("rotate: deleted {}", path.display());
                outcome.deleted.push(path);
            }
            Err(e) => {
                warn!("rotate: failed to delete {}: {}", path.display(), e);
                outcome.failed.push((path, e.to_string()));
            }
        }
    }

    Ok(outcome)
}

/// File names in `out_dir` matching the backup pattern for `db_name`.
pub fn list_backup_names(out_dir: &Path, db_name: &str) -> Result<Vec<String>> {
    let prefix = format!("{}.", db_name);
    let mut names = Vec::new();

    for entry in fs::read_dir(out_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(&prefix) && name.ends_with(BACKUP_SUFFIX) {
            names.push(name.to_string());
        }
    }

    Ok(names)
}

fn gz_path_for(artifact: &Path) -> PathBuf {
    let mut os = artifact.as_os_str().to_os_string();
    os.push(".gz");
    PathBuf::from(os)
}
