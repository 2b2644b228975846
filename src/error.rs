use thiserror::Error;

/// Domain-specific error types for tailtrack
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Request to {0} was not successful")]
    RequestFailed(String),

    #[error("Failed to decode response: {0}")]
    DecodeError(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Response from {0} had no body")]
    EmptyResponse(String),

    #[error("Session already initialized. Stop the previous session before initializing a new one.")]
    SessionAlreadyInitialized,

    #[error("Cannot send tracking events before session is initialized.")]
    SessionNotInitialized,
}

impl TrackerError {
    /// Log the error at a level matching its severity
    pub fn log(&self) {
        match self {
            TrackerError::HttpError(e) => tracing::error!("HTTP error: {:?}", e),
            TrackerError::RequestFailed(url) => tracing::error!("Request failed: {}", url),
            TrackerError::DecodeError(e) => tracing::error!("Decode error: {}", e),
            TrackerError::InvalidUrl(e) => tracing::error!("Invalid URL: {}", e),
            TrackerError::EmptyResponse(url) => tracing::error!("Empty response from {}", url),
            TrackerError::SessionAlreadyInitialized | TrackerError::SessionNotInitialized => {
                tracing::warn!("{}", self)
            }
        }
    }
}

// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, TrackerError>;
