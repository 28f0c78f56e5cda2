//! Keylink CLI - expiring download links for local files
//!
//! Keylink hands out unguessable, time-limited links to files on this
//! machine and serves them over HTTP.
//!
//! ## Quick Start
//!
//! ```bash
//! # Start the retrieval endpoint
//! keylink start --port 8080
//!
//! # Issue a link (in another shell)
//! keylink link ./report.pdf --expire 2h
//! ```

#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;

mod commands;
pub mod ui;

use commands::{Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.log_file.as_deref())?;

    match cli.command {
        Command::Start(args) => commands::start::run(&cli.global, args).await,
        Command::Link(args) => commands::link::run(&cli.global, &args),
        Command::List(args) => commands::list::run(&cli.global, &args),
        Command::Unban(args) => commands::unban::run(&cli.global, &args),
        Command::Revoke(args) => commands::revoke::run(&cli.global, &args),
        Command::Config(args) => commands::config::run(&cli.global, &args),
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,keylink=info,keylink_core=info"));

    if let Some(path) = log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .init();
    }

    Ok(())
}
