//! Error type for the AI layer.

use thiserror::Error;

/// Errors raised while talking to the language model or a notepai server.
#[derive(Error, Debug)]
pub enum AiError {
    /// Transport failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// A body could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    /// The model returned no choices.
    #[error("empty response from model")]
    EmptyResponse,

    /// The caller sent something the endpoint cannot process.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl AiError {
    /// Whether the error was caused by the caller rather than the upstream.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AiError::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, AiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = AiError::Status {
            status: 429,
            body: "slow down".to_string(),
        };
        assert_eq!(err.to_string(), "request failed with status 429: slow down");
        assert!(AiError::InvalidRequest("x".into()).is_client_error());
        assert!(!AiError::EmptyResponse.is_client_error());
    }
}
