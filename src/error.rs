//! Error types for the chat client
//!
//! Defines application-level errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// None of these reach the caller of a session operation: the client folds
/// them into connection transitions or logs and drops them.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed STOMP frame
    #[error("Invalid STOMP frame: {0}")]
    Frame(String),

    /// Broker answered with an ERROR frame
    #[error("Broker error: {0}")]
    Broker(String),

    /// Socket closed before the STOMP session was established
    #[error("Connection closed during handshake")]
    HandshakeClosed,

    /// Payload arrived on a destination we never subscribed to
    #[error("Unknown destination: {0}")]
    UnknownDestination(String),
}
