use shared::SharedError;
use thiserror::Error;

/// Failure of one fetch as seen by the data controller
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error(transparent)]
    Shared(#[from] SharedError),

    /// The request was superseded or its consumer went away. Never surfaced
    /// to the UI.
    #[error("Request cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(error: serde_json::Error) -> Self {
        FetchError::Malformed(error.to_string())
    }
}
