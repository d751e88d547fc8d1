use env_logger::{Builder, Env};
use log::error;

fn init_logger() {
    // Level comes from RUST_LOG, default info.
    // Example: RUST_LOG=debug sqlsnap run
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

fn main() {
    init_logger();

    if let Err(e) = sqlsnap::cli::run() {
        // Diagnostic on stderr, distinct exit code per failure class.
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}
