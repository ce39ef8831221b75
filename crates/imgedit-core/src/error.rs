//! Error types for imgedit

use reqwest::StatusCode;
use thiserror::Error;

/// Result type alias using imgedit's Error
pub type Result<T> = std::result::Result<T, Error>;

/// imgedit error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Transport errors (E100-E199)
    #[error("No response from server: {0}. Is the backend running?")]
    NoResponse(#[source] reqwest::Error),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    // Server-signaled errors (E200-E299)
    #[error("Request failed with status {status}{}", detail_suffix(.message))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Server reported failure: {0}")]
    Rejected(String),

    #[error("Failed to decode response body: {0}")]
    Decode(String),

    // Request construction errors (E300-E399)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn detail_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {}", m))
        .unwrap_or_default()
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoResponse(_) => "E100",
            Self::Timeout(_) => "E101",
            Self::Status { .. } => "E200",
            Self::Rejected(_) => "E201",
            Self::Decode(_) => "E202",
            Self::InvalidRequest(_) => "E300",
            Self::ImageProcessing(_) => "E301",
            Self::Config(_) => "E600",
            Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::NoResponse(_) => {
                Some("Check IMGEDIT_API_BASE_URL with `imgedit config get api_base_url`".to_string())
            }
            Self::Timeout(_) => Some("Raise IMGEDIT_TIMEOUT_SECS or IMGEDIT_UPLOAD_TIMEOUT_SECS".to_string()),
            Self::Status { status, .. } if *status == StatusCode::NOT_FOUND => {
                Some("The API base URL probably lacks the `/api` prefix".to_string())
            }
            Self::Config(_) => Some("imgedit config list".to_string()),
            _ => None,
        }
    }

    /// Whether the request reached the server at all.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::NoResponse(_) | Self::Timeout(_))
    }
}
