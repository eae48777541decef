use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;

pub mod check;
pub mod init;
pub mod poll;

use crate::core::config::DEFAULT_DB_PATH;

#[derive(Subcommand)]
enum Command {
    /// Poll for updates and relay chat messages to the model
    Run {},
    /// Create the database schema
    Init {},
    /// Exercise the database round trip and print what happens
    Check {},
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    let db_path = env::var("BELLHOP_DB_PATH").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

    // Handle each sub command
    match args.command {
        Some(Command::Init {}) => {
            init::run(&db_path).await?;
        }
        Some(Command::Check {}) => {
            check::run(&db_path).await?;
        }
        Some(Command::Run {}) | None => {
            poll::run().await?;
        }
    }

    Ok(())
}
