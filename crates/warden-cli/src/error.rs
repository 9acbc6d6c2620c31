//! Error types for the Warden CLI

use thiserror::Error;
use warden_core::{GuardError, StoreError};

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Guard engine error
    #[error("Guard error: {0}")]
    Guard(#[from] GuardError),

    /// Credential store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No guard with this identifier in the config
    #[error("Unknown access guard: {0}")]
    UnknownGuard(String),
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

/// Errors parsing a session command line
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Blank line
    #[error("Empty command")]
    Empty,

    /// First word is not a known command
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A required argument is missing
    #[error("Missing <{argument}> for '{command}'")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    /// More words than the command takes
    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),
}
