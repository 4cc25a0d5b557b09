use thiserror::Error;

use super::common::ApiErrorDetails;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    ApiError {
        status: u16,
        message: String,
        #[source]
        details: Option<Box<ApiErrorDetails>>,
    },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            ApiError::RequestError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The remote object does not exist; reads drop it from state
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_only_for_404() {
        let missing = ApiError::ApiError {
            status: 404,
            message: "not found".to_string(),
            details: None,
        };
        assert!(missing.is_not_found());

        let forbidden = ApiError::ApiError {
            status: 403,
            message: "forbidden".to_string(),
            details: None,
        };
        assert!(!forbidden.is_not_found());
        assert!(!ApiError::RateLimited.is_not_found());
    }

    #[test]
    fn error_messages_carry_status() {
        let err = ApiError::ApiError {
            status: 400,
            message: "bad policy".to_string(),
            details: None,
        };
        assert_eq!(err.to_string(), "API returned error (HTTP 400): bad policy");
    }
}
