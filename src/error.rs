//! Error types for the chat server
//!
//! Defines application-level errors and mailbox delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;
use tokio_util::codec::LinesCodecError;

use crate::types::UserId;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (send error message to client).
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Line framing error (fatal for the connection)
    #[error("Framing error: {0}")]
    Codec(#[from] LinesCodecError),

    /// Config file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Config values are out of range
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A connection task panicked or was aborted
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Global broadcast queue is closed (server shutting down)
    #[error("Broadcast queue closed")]
    QueueClosed,

    /// No registry entry for the user (already removed)
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// A live entry already exists for this id
    #[error("User already registered: {0}")]
    AlreadyRegistered(UserId),

    /// `\rename` with an unusable payload
    #[error("Malformed rename: {0}")]
    MalformedRename(String),
}

/// Mailbox delivery errors
///
/// Occurs when pushing into a user's bounded mailbox.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// Mailbox is at capacity; the message was dropped
    #[error("Mailbox full")]
    Full,

    /// The writer has gone away
    #[error("Mailbox closed")]
    Closed,
}
