use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use log::warn;

use crate::config::BackupConfig;
use crate::errors::{BackupError, Result};
use crate::rotate;
use crate::run::{run_backup, RunReport};
use crate::snapshot;

#[derive(Parser, Debug)]
#[command(
    name = "sqlsnap",
    version,
    about = "Consistent snapshot backup and rotation for SQLite databases",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Snapshot, compress and rotate: the full backup procedure.
    Run {
        /// Source database (default: SQLSNAP_DB).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Backup directory (default: SQLSNAP_OUT_DIR).
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// How many compressed backups to keep (default: SQLSNAP_KEEP).
        #[arg(long)]
        keep: Option<usize>,
        /// Lock wait ceiling in milliseconds (default: SQLSNAP_BUSY_TIMEOUT_MS).
        #[arg(long)]
        busy_timeout_ms: Option<u64>,
        /// Print the run report as JSON instead of the bare backup path.
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Produce an uncompressed consistent snapshot at an explicit path.
    /// No compression, no rotation.
    Snapshot {
        /// Source database (default: SQLSNAP_DB).
        #[arg(long)]
        db: Option<PathBuf>,
        /// Where the snapshot file is written.
        #[arg(long)]
        dest: PathBuf,
        #[arg(long)]
        busy_timeout_ms: Option<u64>,
    },

    /// Rotation only: prune the backup set down to the newest N.
    Prune {
        /// Backup directory (default: SQLSNAP_OUT_DIR).
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Database file name the backups belong to
        /// (default: file name of SQLSNAP_DB).
        #[arg(long)]
        db_name: Option<String>,
        #[arg(long)]
        keep: Option<usize>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = BackupConfig::from_env()?;

    match cli.cmd {
        Cmd::Run {
            db,
            out_dir,
            keep,
            busy_timeout_ms,
            json,
        } => {
            let mut cfg = cfg;
            if let Some(p) = db {
                cfg = cfg.with_db_path(p);
            }
            if let Some(p) = out_dir {
                cfg = cfg.with_out_dir(p);
            }
            if let Some(n) = keep {
                cfg = cfg.with_keep(n);
            }
            if let Some(ms) = busy_timeout_ms {
                cfg = cfg.with_busy_timeout(Duration::from_millis(ms));
            }

            let report = run_backup(&cfg)?;
            print_report(&report, json)?;
        }

        Cmd::Snapshot {
            db,
            dest,
            busy_timeout_ms,
        } => {
            let db = db.unwrap_or(cfg.db_path);
            let busy = busy_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(cfg.busy_timeout);
            let artifact = snapshot::snapshot_to(&db, &dest, busy)?;
            println!("{}", artifact.display());
        }

        Cmd::Prune {
            out_dir,
            db_name,
            keep,
            json,
        } => {
            let out_dir = out_dir.unwrap_or(cfg.out_dir);
            let db_name = match db_name {
                Some(n) => n,
                None => cfg
                    .db_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .ok_or_else(|| {
                        BackupError::Config("prune needs --db-name or SQLSNAP_DB".to_string())
                    })?,
            };
            let keep = keep.unwrap_or(cfg.keep);

            let outcome = rotate::prune_backups(&out_dir, &db_name, keep)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "deleted": outcome.deleted,
                        "delete_failures": outcome.failed,
                    }))
                    .map_err(|e| BackupError::Io(std::io::Error::other(e)))?
                );
            } else {
                for p in &outcome.deleted {
                    println!("{}", p.display());
                }
            }
        }
    }
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report)
                .map_err(|e| BackupError::Io(std::io::Error::other(e)))?
        );
    } else {
        // Process contract: the final backup path is the stdout payload.
        println!("{}", report.backup.display());
    }
    if !report.delete_failures.is_empty() {
        warn!(
            "run: {} old backup(s) could not be deleted",
            report.delete_failures.len()
        );
    }
    Ok(())
}
