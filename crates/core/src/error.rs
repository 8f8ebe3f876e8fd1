//! Error types for the stbl-mcp domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use std::path::PathBuf;
use thiserror::Error;

/// The top-level error type for all stbl-mcp operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Event engine errors ---
    #[error("Event engine error: {0}")]
    Event(#[from] EventError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Chain client errors ---
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors raised by the event subscription engine.
///
/// Transport failures are recovered internally by the reconnection state
/// machine; only `connect()` surfaces a `Connection` error synchronously.
/// A `Parse` error discards the offending frame without tearing down the
/// connection.
#[derive(Debug, Clone, Error)]
pub enum EventError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Malformed event payload: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write {path}: {reason}")]
    Write { path: PathBuf, reason: String },

    #[error("Record serialization failed: {0}")]
    Serde(String),
}

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Message post failed: {0}")]
    PostFailed(String),

    #[error("Contract read failed: {0}")]
    ReadFailed(String),

    #[error("Contract write failed: {0}")]
    WriteFailed(String),

    #[error("Contract deployment failed: {0}")]
    DeployFailed(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_error_displays_correctly() {
        let err = Error::Event(EventError::Connection("handshake refused".into()));
        assert!(err.to_string().contains("handshake refused"));
    }

    #[test]
    fn tool_error_displays_correctly() {
        let err = Error::Tool(ToolError::ExecutionFailed {
            tool_name: "stbl_deploy".into(),
            reason: "constructor reverted".into(),
        });
        assert!(err.to_string().contains("stbl_deploy"));
        assert!(err.to_string().contains("constructor reverted"));
    }

    #[test]
    fn storage_error_includes_path() {
        let err = StorageError::Read {
            path: PathBuf::from("/tmp/history.json"),
            reason: "permission denied".into(),
        };
        assert!(err.to_string().contains("history.json"));
    }
}
