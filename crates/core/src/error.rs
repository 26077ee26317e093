//! Unified error types for the storefront catalog layer.
//!
//! Messages carry a stable code prefix so they survive being flattened into
//! MCP error payloads.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type shared by the core, client and server crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., unknown entity type).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// No entity found for the given id or slug.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// A payload could not be decoded into the expected shape.
    #[error("INVALID_PAYLOAD: {0}")]
    InvalidPayload(String),

    /// Remote API request failed (network or non-2xx).
    #[error("FETCH_ERROR: {message}")]
    Fetch { status: Option<u16>, message: String },

    /// The change notification channel could not publish or read.
    #[error("CHANNEL_ERROR: {0}")]
    Channel(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidPayload(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::InvalidPayload(msg) => (-32003, msg.clone()),
            Error::Fetch { status: Some(status), message } => (-32004, format!("{message} (status {status})")),
            Error::Fetch { status: None, message } => (-32004, message.clone()),
            Error::Channel(msg) => (-32005, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
