//! Provider API errors

use thiserror::Error;

/// Error returned by a provider API client
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provider answered with a non-success status and an error code
    #[error("API request failed ({status}): {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid endpoint URL: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Unknown operation {service}:{operation}")]
    UnknownOperation { service: String, operation: String },

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),
}

impl ApiError {
    /// Provider error code, if the provider sent one
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// HTTP status of a provider error
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Service { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Format an API error for display
/// Security: Maps status classes to short messages instead of echoing provider details
pub fn format_api_error(error: &anyhow::Error) -> String {
    let status = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ApiError>())
        .and_then(ApiError::status);

    match status {
        Some(401) => return "Authentication failed. Check your provider credentials.".to_string(),
        Some(403) => return "Permission denied. Check the declared API permissions.".to_string(),
        Some(404) => return "Resource not found.".to_string(),
        Some(409) => return "Resource conflict. The resource may be in use.".to_string(),
        Some(429) => return "Rate limit exceeded. Please try again later.".to_string(),
        Some(s) if s >= 500 => {
            return "Provider service temporarily unavailable. Please try again.".to_string()
        }
        _ => {}
    }

    let error_str = error.to_string();
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(120)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
