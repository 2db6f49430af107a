// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gzlog - Recovery log inspection

mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{dump, replay};
use gz_recoverylog::RecorderConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "gzlog",
    version,
    about = "gzlog inspects and replays storage engine recovery logs"
)]
struct Cli {
    /// Recorder config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print each recorded op
    Dump(dump::DumpArgs),
    /// Replay ops and print the resulting hints
    Replay(replay::ReplayArgs),
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RecorderConfig::load(path)?,
        None => RecorderConfig::default(),
    };

    match cli.command {
        Commands::Dump(args) => dump::handle(args),
        Commands::Replay(args) => replay::handle(args, &config),
    }
}
