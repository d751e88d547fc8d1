//! Snapshot Engine: consistent online copy of a live SQLite database.
//!
//! The copy goes through SQLite's own backup API, never a raw file copy —
//! a filesystem copy of a file with active writers can capture a torn page
//! set. Sequence:
//! - open the source with a busy timeout (bounded wait on transient locks),
//! - best-effort PRAGMA wal_checkpoint(FULL) to fold the WAL into the main
//!   file (shrinks the working set; the backup is correct without it),
//! - drive the page-level backup into a temporary file, retrying Busy/Locked
//!   steps until a deadline,
//! - close both connections, then atomically rename temp -> artifact.
//!
//! A crash at any point leaves either nothing or a stale `.tmp` file; the
//! final artifact name only ever appears complete.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rusqlite::backup::{Backup, StepResult};
use rusqlite::{Connection, OpenFlags};

use crate::errors::{BackupError, Result};

/// Pages copied per backup step. Between steps SQLite lets concurrent
/// writers in, so the source is never blocked for the whole copy.
const PAGES_PER_STEP: std::os::raw::c_int = 128;

/// Pause before retrying a Busy/Locked step.
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Removes a temporary file on drop unless disarmed. Keeps every failure
/// exit out of the copy path from leaving a stray `.tmp` behind.
struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl TempGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.armed {
            // Best-effort: the file may never have been created.
            let _ = fs::remove_file(&self.path);
        }
    }
}

/// Produce a Snapshot Artifact of `db_path` at `dest`.
///
/// `busy_timeout` bounds both statement-level lock waits and the total
/// time spent retrying Busy/Locked backup steps. On success `dest` holds a
/// complete, self-consistent database; on any failure `dest` does not exist
/// (a pre-existing file at `dest` is replaced, matching rename semantics).
pub fn snapshot_to(db_path: &Path, dest: &Path, busy_timeout: Duration) -> Result<PathBuf> {
    if !db_path.exists() {
        return Err(BackupError::SourceNotFound(db_path.to_path_buf()));
    }

    let tmp = tmp_path(dest);
    info!(
        "snapshot: start, src={}, dest={}, busy_timeout_ms={}",
        db_path.display(),
        dest.display(),
        busy_timeout.as_millis()
    );

    let mut guard = TempGuard::new(tmp.clone());

    let src = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    src.busy_timeout(busy_timeout)?;

    // Fold pending WAL frames into the main file. Contention here is
    // harmless: the backup below captures WAL content either way.
    if let Err(e) = src.query_row("PRAGMA wal_checkpoint(FULL)", [], |_| Ok(())) {
        warn!("snapshot: wal_checkpoint(FULL) failed, proceeding: {}", e);
    }

    let mut dst = Connection::open(&tmp)?;
    copy_pages(&src, &mut dst, busy_timeout)?;

    // Deterministic close of both connections before the rename; a close
    // error means the copy cannot be trusted.
    dst.close().map_err(|(_, e)| BackupError::CopyFailed(e))?;
    src.close().map_err(|(_, e)| BackupError::CopyFailed(e))?;

    fs::rename(&tmp, dest)?;
    guard.disarm();

    info!("snapshot: done, artifact={}", dest.display());
    Ok(dest.to_path_buf())
}

/// Run the page-level backup to completion, waiting out Busy/Locked steps
/// up to `busy_timeout` total.
fn copy_pages(src: &Connection, dst: &mut Connection, busy_timeout: Duration) -> Result<()> {
    let backup = Backup::new(src, dst)?;
    let deadline = Instant::now() + busy_timeout;
    let mut steps: u64 = 0;

    loop {
        match backup.step(PAGES_PER_STEP)? {
            StepResult::Done => break,
            StepResult::More => {
                steps += 1;
            }
            // Busy, Locked, and (StepResult is non-exhaustive) anything a
            // future SQLite reports short of Done: wait it out, bounded by
            // the deadline. Hard copy errors surface as Err from step().
            _ => {
                if Instant::now() >= deadline {
                    return Err(BackupError::LockTimeout(busy_timeout));
                }
                thread::sleep(BUSY_RETRY_DELAY);
            }
        }
    }

    debug!("snapshot: copy complete after {} step(s)", steps + 1);
    Ok(())
}

fn tmp_path(dest: &Path) -> PathBuf {
    let mut os = dest.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}
