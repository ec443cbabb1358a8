use std::fmt;

use async_trait::async_trait;

use super::records::RecordStream;

/// Errors that can occur while talking to the question-answering API.
#[derive(Debug)]
pub enum ApiError {
    /// Client misconfigured (bad base URL). Not retryable.
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused, reset mid-body).
    Network(String),
    /// API returned a non-success status.
    Api { status: u16, message: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Config(msg) => write!(f, "config error: {msg}"),
            ApiError::Network(msg) => write!(f, "network error: {msg}"),
            ApiError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

/// The remote question-answering service.
#[async_trait]
pub trait QueryClient: Send + Sync {
    /// Human-readable endpoint description (shown in the title bar).
    fn endpoint(&self) -> &str;

    /// Ask a question and open the streamed answer.
    ///
    /// Fails before any record is produced if the request cannot be sent or
    /// the service answers with a non-success status.
    async fn open(&self, question: &str) -> Result<RecordStream, ApiError>;

    /// Probe the service's health endpoint.
    async fn health(&self) -> Result<(), ApiError>;
}
