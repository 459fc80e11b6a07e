//! Error types for the minerlink control channel.

use thiserror::Error;

use crate::engine::EngineError;

/// Main error type for the control channel.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Listener bind/lifecycle errors.
    #[error("Bind error: {message}")]
    Bind { message: String },

    /// Wire protocol errors.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },

    /// Parameter validation errors.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// Client-side errors.
    #[error("Client error: {kind}")]
    Client { kind: ClientErrorKind },

    /// Mining engine errors, caught at the dispatcher boundary.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Wire protocol error kinds.
#[derive(Error, Debug)]
pub enum ProtocolErrorKind {
    #[error("Line too long: {size} bytes exceeds maximum of {max} bytes")]
    LineTooLong { size: usize, max: usize },

    #[error("Malformed record: {message}")]
    MalformedRecord { message: String },

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection timed out")]
    ConnectionTimeout,
}

/// Parameter validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Missing required parameter: {param}")]
    MissingParameter { param: String },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },
}

/// Client-side error kinds.
#[derive(Error, Debug)]
pub enum ClientErrorKind {
    #[error("Not connected")]
    NotConnected,

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Command timed out after {timeout_ms} ms")]
    CommandTimeout { timeout_ms: u64 },

    #[error("Handshake failed: {message}")]
    HandshakeFailed { message: String },

    #[error("Server reported failure: {message}")]
    ServerFailure { message: String },
}

/// Result type alias for control channel operations.
pub type ControlResult<T> = Result<T, ControlError>;
