//! CLI subcommands.

pub mod matches;
pub mod migrate;
pub mod replay;

use thiserror::Error;

use helper_server::config::ConfigError;
use helper_server::db::RepositoryError;
use helper_server::llm::ModelError;

/// Errors that end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store operation or migration failed.
    #[error("Store error: {0}")]
    Repository(#[from] RepositoryError),

    /// Model client could not be built.
    #[error("Model client error: {0}")]
    Model(#[from] ModelError),

    /// Transcript file could not be read.
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}
