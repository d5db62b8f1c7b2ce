//! Error types for the command queue
//!
//! Domain errors use thiserror; receiver code reports failures through
//! anyhow and is converted at the dispatcher boundary.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level command queue error
#[derive(Debug, Error)]
pub enum CommandsError {
    /// Store-related errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Receiver registration errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// `step` was called before `initialize`
    #[error("Dispatcher has not been initialized")]
    NotInitialized,
}

/// Command store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store content exists but is not a list of command records
    #[error("Corrupt command store at {path}: {detail}")]
    Corrupt {
        /// Store location
        path: PathBuf,
        /// Parser diagnostics
        detail: String,
    },

    /// Atomic write failed
    #[error("Atomic write failed for {path}: {detail}")]
    AtomicWriteFailed {
        /// Path where write failed
        path: PathBuf,
        /// Error details
        detail: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Receiver registration errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Registration with an empty or blank command name
    #[error("Invalid receiver: {0}")]
    InvalidReceiver(String),
}

/// Convenience result alias for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Failure while executing a single command.
///
/// Never returned from the dispatcher; it is logged and recorded on the
/// command as a `failure` response.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// No receiver registered under the command name
    #[error("No receiver registered for command '{0}'")]
    NotFound(String),

    /// Receiver returned an error
    #[error("Receiver '{name}' failed: {error:#}")]
    Failed {
        /// Command name
        name: String,
        /// Error reported by the receiver
        error: anyhow::Error,
    },

    /// Receiver panicked
    #[error("Receiver '{name}' panicked: {message}")]
    Panicked {
        /// Command name
        name: String,
        /// Panic payload, if it was a string
        message: String,
    },
}

/// Result type using CommandsError
pub type Result<T> = std::result::Result<T, CommandsError>;
