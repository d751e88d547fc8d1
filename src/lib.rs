pub mod cli;
pub mod config;
pub mod errors;
pub mod rotate;
pub mod run;
pub mod runlock;
pub mod snapshot;

// Convenience re-exports
pub use config::BackupConfig;
pub use errors::BackupError;
pub use run::{run_backup, RunReport};
