//! Medallion CLI
//!
//! Modes: chat (default REPL), ask, check, init-sample, schedule.
//! Logs go to stderr (or `--log-file`); stdout carries replies only.

use clap::Parser;

use medallion::cli::{run_cli_mode, Args};

fn main() {
    let args = Args::parse();
    std::process::exit(run_cli_mode(args));
}
