//! Error types for the Gemini text-to-speech client.
//!
//! [`GeminiError::is_quota_exhausted`] is the only place that decides whether
//! a failure ends the whole batch.

use thiserror::Error;

/// Errors that can occur while asking Gemini for speech.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// HTTP 429. `message` is the raw response body.
    #[error("rate limited (status 429): {message}")]
    RateLimited { message: String },

    /// Any other non-success HTTP status.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Transport failure (DNS, refused connection, timeout).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The body arrived but could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl GeminiError {
    /// True when the project's quota for the whole period is used up.
    ///
    /// Gemini reports this as a 429 with status `RESOURCE_EXHAUSTED` and
    /// either a zero limit or a per-day quota id.
    pub fn is_quota_exhausted(&self) -> bool {
        match self {
            GeminiError::RateLimited { message } => {
                message.contains("RESOURCE_EXHAUSTED")
                    && (message.contains("limit: 0") || message.contains("Day"))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_display() {
        let err = GeminiError::RateLimited {
            message: "slow down".into(),
        };
        assert_eq!(err.to_string(), "rate limited (status 429): slow down");
    }

    #[test]
    fn api_error_display() {
        let err = GeminiError::ApiError {
            status: 400,
            message: "API key not valid".into(),
        };
        assert_eq!(err.to_string(), "API error (status 400): API key not valid");
    }

    #[test]
    fn daily_quota_is_fatal() {
        let err = GeminiError::RateLimited {
            message: r#"{"error":{"code":429,"status":"RESOURCE_EXHAUSTED","details":[{"quotaId":"GenerateRequestsPerDayPerProjectPerModel-FreeTier"}]}}"#.into(),
        };
        assert!(err.is_quota_exhausted());
    }

    #[test]
    fn zero_limit_is_fatal() {
        let err = GeminiError::RateLimited {
            message: "RESOURCE_EXHAUSTED: quota exceeded, limit: 0".into(),
        };
        assert!(err.is_quota_exhausted());
    }

    #[test]
    fn per_minute_limit_is_recoverable() {
        let err = GeminiError::RateLimited {
            message: "RESOURCE_EXHAUSTED: GenerateRequestsPerMinute, limit: 3".into(),
        };
        assert!(!err.is_quota_exhausted());

        let err = GeminiError::RateLimited {
            message: "limit: 0 per Day".into(),
        };
        assert!(!err.is_quota_exhausted());
    }

    #[test]
    fn other_errors_are_never_fatal() {
        let err = GeminiError::ApiError {
            status: 500,
            message: "RESOURCE_EXHAUSTED limit: 0".into(),
        };
        assert!(!err.is_quota_exhausted());
        assert!(!GeminiError::InvalidResponse("bad".into()).is_quota_exhausted());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeminiError>();
    }
}
