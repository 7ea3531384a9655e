use thiserror::Error;

/// Result type for worker operations
pub type Result<T> = std::result::Result<T, WorkerError>;

/// Worker error types
#[derive(Debug, Error)]
pub enum WorkerError {
    /// Transport or auth failure talking to the queue
    #[error("Queue error: {0}")]
    Queue(String),

    /// The job-launch collaborator rejected the request or is unreachable
    #[error("Launch error: {0}")]
    Launch(String),

    /// Message body does not parse as JSON
    #[error("Malformed message body: {0}")]
    MalformedBody(#[from] serde_json::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
