// tests/config_env.rs
//
// from_env behavior. One test function on purpose: #[test]s in a binary run
// in parallel threads, and the environment is process-global.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use sqlsnap::errors::BackupError;
use sqlsnap::BackupConfig;

fn clear_env() {
    for k in [
        "SQLSNAP_DB",
        "SQLSNAP_OUT_DIR",
        "SQLSNAP_KEEP",
        "SQLSNAP_BUSY_TIMEOUT_MS",
        "SQLSNAP_GZIP_LEVEL",
    ] {
        std::env::remove_var(k);
    }
}

#[test]
fn from_env_defaults_overrides_and_failfast() -> Result<()> {
    // Defaults with a clean environment.
    clear_env();
    let cfg = BackupConfig::from_env()?;
    assert_eq!(cfg.db_path, PathBuf::from("/var/lib/sqlsnap/data.db"));
    assert_eq!(cfg.out_dir, PathBuf::from("/var/lib/sqlsnap/backups"));
    assert_eq!(cfg.keep, 30);
    assert_eq!(cfg.busy_timeout, Duration::from_millis(30_000));
    assert_eq!(cfg.gzip_level, 6);

    // Explicit values win.
    std::env::set_var("SQLSNAP_DB", "/srv/app/app.db");
    std::env::set_var("SQLSNAP_OUT_DIR", "/srv/app/backups");
    std::env::set_var("SQLSNAP_KEEP", "7");
    std::env::set_var("SQLSNAP_BUSY_TIMEOUT_MS", "1500");
    std::env::set_var("SQLSNAP_GZIP_LEVEL", "9");
    let cfg = BackupConfig::from_env()?;
    assert_eq!(cfg.db_path, PathBuf::from("/srv/app/app.db"));
    assert_eq!(cfg.out_dir, PathBuf::from("/srv/app/backups"));
    assert_eq!(cfg.keep, 7);
    assert_eq!(cfg.busy_timeout, Duration::from_millis(1500));
    assert_eq!(cfg.gzip_level, 9);
    assert_eq!(cfg.db_file_name()?, "app.db");

    // Malformed retention count fails fast, before any side effect.
    std::env::set_var("SQLSNAP_KEEP", "-1");
    let err = BackupConfig::from_env().expect_err("negative keep must fail");
    assert!(matches!(err, BackupError::Config(_)));
    assert_eq!(err.exit_code(), 2);

    std::env::set_var("SQLSNAP_KEEP", "lots");
    assert!(BackupConfig::from_env().is_err());
    std::env::set_var("SQLSNAP_KEEP", "7");

    // Out-of-range gzip level is rejected too.
    std::env::set_var("SQLSNAP_GZIP_LEVEL", "12");
    assert!(BackupConfig::from_env().is_err());

    clear_env();
    Ok(())
}
