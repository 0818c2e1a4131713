#![forbid(unsafe_code)]

//! imon: file integrity monitor CLI entry point.

use clap::Parser;

mod cli_app;

fn main() {
    let args = cli_app::Cli::parse();
    if let Err(e) = cli_app::run(&args) {
        eprintln!("imon: {e}");
        std::process::exit(e.exit_code());
    }
}
