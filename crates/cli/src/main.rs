// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ovl - Overlap CLI
//!
//! Front-end for the overlap probe. The tracer daemon (`ovld`) runs
//! separately; `ovl check` consults the team instances (or the daemon's
//! local mirror) before an edit lands.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::check;

#[derive(Parser)]
#[command(
    name = "ovl",
    version,
    about = "Overlap - know when a teammate is already in the file"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an intended edit for overlap with teammates' active work
    Check(check::CheckArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Check(args) => check::run(args).await?,
    };
    std::process::exit(exit_code);
}
