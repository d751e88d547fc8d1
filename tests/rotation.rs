// tests/rotation.rs
//
// Run only this file:
//   cargo test --test rotation -- --nocapture
//
// Covers retention semantics:
// 1) keep=N keeps the N newest by name-embedded timestamp.
// 2) keep=0 deletes every matching backup, including a just-created one.
// 3) Fewer members than N: nothing is deleted.
// 4) Unrelated files in the same directory are never touched.
// 5) A real run against a pre-seeded set ends at min(N, previous + 1).

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;
use rusqlite::Connection;

use sqlsnap::rotate::{list_backup_names, prune_backups};
use sqlsnap::{run_backup, BackupConfig};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    base.join(format!("sqlsnap-rot-{prefix}-{pid}-{t}-{id}"))
}

/// Seed a fake member of the backup set with a fixed timestamp.
fn seed_backup(dir: &PathBuf, stamp: &str) -> Result<PathBuf> {
    let path = dir.join(format!("app.db.{stamp}.sqlite.gz"));
    fs::write(&path, b"gz")?;
    Ok(path)
}

#[test]
fn prune_keeps_newest_n() -> Result<()> {
    let out = unique_root("keep-n");
    fs::create_dir_all(&out)?;
    seed_backup(&out, "20260101-000000")?;
    seed_backup(&out, "20260102-000000")?;
    seed_backup(&out, "20260103-000000")?;
    seed_backup(&out, "20260104-000000")?;

    let outcome = prune_backups(&out, "app.db", 2)?;
    assert_eq!(outcome.deleted.len(), 2);
    assert!(outcome.failed.is_empty());

    let mut left = list_backup_names(&out, "app.db")?;
    left.sort();
    assert_eq!(
        left,
        vec![
            "app.db.20260103-000000.sqlite.gz".to_string(),
            "app.db.20260104-000000.sqlite.gz".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn prune_zero_deletes_everything_matching() -> Result<()> {
    let out = unique_root("keep-0");
    fs::create_dir_all(&out)?;
    seed_backup(&out, "20260101-000000")?;
    seed_backup(&out, "20260102-000000")?;

    let outcome = prune_backups(&out, "app.db", 0)?;
    assert_eq!(outcome.deleted.len(), 2);
    assert!(list_backup_names(&out, "app.db")?.is_empty());
    Ok(())
}

#[test]
fn prune_under_limit_deletes_nothing() -> Result<()> {
    let out = unique_root("under");
    fs::create_dir_all(&out)?;
    seed_backup(&out, "20260101-000000")?;
    seed_backup(&out, "20260102-000000")?;

    let outcome = prune_backups(&out, "app.db", 5)?;
    assert!(outcome.deleted.is_empty());
    assert_eq!(list_backup_names(&out, "app.db")?.len(), 2);
    Ok(())
}

#[test]
fn prune_ignores_unrelated_files() -> Result<()> {
    let out = unique_root("unrelated");
    fs::create_dir_all(&out)?;
    seed_backup(&out, "20260101-000000")?;
    // Wrong prefix, wrong suffix, and an in-flight temp file.
    fs::write(out.join("other.db.20260101-000000.sqlite.gz"), b"x")?;
    fs::write(out.join("app.db.20260102-000000.sqlite"), b"x")?;
    fs::write(out.join("app.db.20260103-000000.sqlite.tmp"), b"x")?;

    let outcome = prune_backups(&out, "app.db", 0)?;
    assert_eq!(outcome.deleted.len(), 1);
    assert!(out.join("other.db.20260101-000000.sqlite.gz").exists());
    assert!(out.join("app.db.20260102-000000.sqlite").exists());
    assert!(out.join("app.db.20260103-000000.sqlite.tmp").exists());
    Ok(())
}

#[cfg(unix)]
#[test]
fn prune_collects_delete_failures_and_still_succeeds() -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let out = unique_root("denied");
    fs::create_dir_all(&out)?;
    seed_backup(&out, "20260101-000000")?;
    seed_backup(&out, "20260102-000000")?;
    seed_backup(&out, "20260103-000000")?;

    // Unlinking needs write permission on the directory.
    fs::set_permissions(&out, fs::Permissions::from_mode(0o555))?;

    // Root ignores directory permissions; nothing to observe in that case.
    if fs::File::create(out.join(".writable")).is_ok() {
        fs::set_permissions(&out, fs::Permissions::from_mode(0o755))?;
        return Ok(());
    }

    // Every deletion fails, yet prune reports Ok: an undeletable old
    // backup never fails a run.
    let outcome = prune_backups(&out, "app.db", 1)?;
    assert!(outcome.deleted.is_empty());
    assert_eq!(outcome.failed.len(), 2);
    for (path, reason) in &outcome.failed {
        assert!(path.starts_with(&out));
        assert!(!reason.is_empty());
    }
    assert_eq!(list_backup_names(&out, "app.db")?.len(), 3);

    fs::set_permissions(&out, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[test]
fn run_bounds_set_to_min_of_keep_and_previous_plus_one() -> Result<()> {
    let root = unique_root("bound");
    fs::create_dir_all(&root)?;
    let db = root.join("app.db");
    let out = root.join("backups");
    fs::create_dir_all(&out)?;
    Connection::open(&db)?.execute_batch("CREATE TABLE t (x); INSERT INTO t VALUES (42);")?;

    // Three pre-existing backups, all older than anything a fresh run can
    // produce. keep=2 must leave exactly 2: the new one and the newest seed.
    seed_backup(&out, "20250101-000000")?;
    seed_backup(&out, "20250102-000000")?;
    seed_backup(&out, "20250103-000000")?;

    let cfg = BackupConfig::default()
        .with_db_path(&db)
        .with_out_dir(&out)
        .with_keep(2);
    let report = run_backup(&cfg)?;
    assert_eq!(report.deleted.len(), 2);

    let mut left = list_backup_names(&out, "app.db")?;
    left.sort();
    assert_eq!(left.len(), 2);
    assert_eq!(left[0], "app.db.20250103-000000.sqlite.gz");
    assert_eq!(
        out.join(&left[1]),
        report.backup,
        "newest survivor must be the backup just produced"
    );
    Ok(())
}

#[test]
fn run_with_keep_zero_leaves_empty_set() -> Result<()> {
    let root = unique_root("zero");
    fs::create_dir_all(&root)?;
    let db = root.join("app.db");
    let out = root.join("backups");
    Connection::open(&db)?.execute_batch("CREATE TABLE t (x);")?;

    let cfg = BackupConfig::default()
        .with_db_path(&db)
        .with_out_dir(&out)
        .with_keep(0);
    let report = run_backup(&cfg)?;

    // The just-created backup is treated like any other member.
    assert_eq!(report.deleted.len(), 1);
    assert_eq!(report.deleted[0], report.backup);
    assert!(list_backup_names(&out, "app.db")?.is_empty());
    Ok(())
}
