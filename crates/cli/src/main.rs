//! Helper CLI - database migrations, transcript replay, and match reports.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! helper-cli migrate
//!
//! # Replay a transcript of `email: message` lines through the assistant
//! helper-cli replay transcript.txt
//!
//! # Print the provider/seeker match report
//! helper-cli matches
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "helper-cli")]
#[command(author, version, about = "Care matching helper CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Replay a transcript file through the assistant
    Replay {
        /// File of `email: message` lines
        file: String,
    },
    /// Print matches for every stored profile
    Matches,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Replay { file } => {
            commands::replay::run(&file).await?;
        }
        Commands::Matches => commands::matches::run().await?,
    }
    Ok(())
}
