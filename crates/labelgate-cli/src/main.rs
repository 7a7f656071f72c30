//! Labelgate CLI: the `labelgate` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Verify {
            application,
            ocr,
            pretty,
        } => commands::verify::run(application, ocr, pretty),

        Commands::NormalizeOcr { ocr, pretty } => commands::normalize_ocr::run(ocr, pretty),

        Commands::Requirements {
            application,
            pretty,
        } => commands::requirements::run(application, pretty),
    }
}
