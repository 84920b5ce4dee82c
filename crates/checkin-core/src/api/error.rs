use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Error body shape returned by the backend on failures: `{ "message": "..." }`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Extract the human-readable message from a JSON error body.
    /// Bodies that are not JSON, or JSON without `message`, yield `None`.
    fn body_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body).ok()?.message
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::body_message(body).unwrap_or_else(|| {
            if !body.trim().is_empty() {
                debug!(
                    status = status.as_u16(),
                    body = %Self::truncate_body(body),
                    "Error response without a JSON message"
                );
            }
            String::new()
        });
        match status.as_u16() {
            400 | 422 => ApiError::BadRequest(message),
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(message),
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// The message the backend attached to a rejection, if it sent one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            ApiError::AccessDenied(m)
            | ApiError::NotFound(m)
            | ApiError::BadRequest(m)
            | ApiError::Conflict(m)
            | ApiError::ServerError(m) => {
                if m.trim().is_empty() {
                    None
                } else {
                    Some(m.as_str())
                }
            }
            _ => None,
        }
    }

    /// True when the backend could not be reached or failed internally.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ApiError::NetworkError(_) | ApiError::ServerError(_))
    }
}
