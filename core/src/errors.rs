use thiserror::Error;

/// Errors produced while talking to the Answer Service or loading configuration
#[derive(Error, Debug)]
pub enum AskError {
    /// No response was obtained: connection, request construction, timeout, body read
    #[error("Transport Error: {0}")]
    Transport(String),

    /// A response arrived but its status is not success-class
    #[error("HTTP Error: {status_code} - {message}")]
    Status { status_code: u16, message: String },

    /// The body is not JSON, or does not match the expected answer shape
    #[error("Malformed Payload: {0}")]
    MalformedPayload(String),

    #[error("Configuration Error: {0}")]
    Config(String),
}

/// Coarse classification used by the diagnostic channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    ServerReported,
    Malformed,
    Config,
}

impl AskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AskError::Transport(_) => FailureKind::Transport,
            AskError::Status { .. } => FailureKind::ServerReported,
            AskError::MalformedPayload(_) => FailureKind::Malformed,
            AskError::Config(_) => FailureKind::Config,
        }
    }
}

/// Result type for Answer Service operations
pub type AskResult<T> = Result<T, AskError>;
