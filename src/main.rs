#![forbid(unsafe_code)]

//! agd: aigent dashboard backend CLI entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();

    let filter = EnvFilter::try_from_env("AGD_LOG")
        .unwrap_or_else(|_| EnvFilter::new(args.default_log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cli_app::run(&args) {
        eprintln!("agd: {e}");
        std::process::exit(e.exit_code());
    }
}
