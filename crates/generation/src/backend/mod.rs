//! Pluggable generation backend abstraction
//!
//! Backends take the full turn history on every call; the remote service is
//! stateless, so conversation memory lives in [`crate::ChatSession`].

pub mod factory;
pub mod gemini;

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use serde::Serialize;

use crate::types::Turn;

/// Error types for backend operations
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        /// Provider status string (e.g., "INVALID_ARGUMENT", "RESOURCE_EXHAUSTED")
        provider_status: Option<String>,
        message: String,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Request was blocked. Reason: {0}")]
    Blocked(String),
}

/// Failure categories callers can act on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Conversation exceeded the model's context window
    TokenLimit,
    /// Content filter rejected the prompt or the output
    Blocked,
    /// Quota or rate limit hit
    RateLimited,
    /// Key missing, invalid or lacking permission
    Auth,
    /// Connection-level failure
    Transport,
    /// Any other non-success status
    Api,
    /// Body did not have the expected shape
    Decode,
    /// Local configuration problem
    Config,
}

impl BackendError {
    /// Classify this error, preferring structured provider fields over message text
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Config,
            Self::Blocked(_) => ErrorKind::Blocked,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Http(e) if e.is_decode() => ErrorKind::Decode,
            Self::Http(_) => ErrorKind::Transport,
            Self::Api {
                status,
                provider_status,
                message,
            } => {
                let provider_status = provider_status.as_deref().unwrap_or_default();
                if matches!(*status, 401 | 403)
                    || matches!(provider_status, "UNAUTHENTICATED" | "PERMISSION_DENIED")
                {
                    return ErrorKind::Auth;
                }
                if *status == 429 || provider_status == "RESOURCE_EXHAUSTED" {
                    return ErrorKind::RateLimited;
                }
                classify_error_text(message).unwrap_or(ErrorKind::Api)
            }
        }
    }

    /// Short type label used when reporting the error to users
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::Http(_) => "HttpError",
            Self::Api { .. } => "ApiError",
            Self::Decode(_) => "DecodeError",
            Self::Blocked(_) => "BlockedError",
        }
    }
}

/// Last-resort text heuristic for errors the provider does not tag structurally.
///
/// Kept in one place so it can be swapped out once the provider exposes a
/// dedicated status for context overflow.
pub fn classify_error_text(message: &str) -> Option<ErrorKind> {
    let lower = message.to_lowercase();
    if lower.contains("token") && (lower.contains("exceeds") || lower.contains("limit")) {
        return Some(ErrorKind::TokenLimit);
    }
    None
}

/// One increment of a streamed reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationChunk {
    /// Text produced in this increment (may be empty)
    pub text: Option<String>,
    /// Set when the provider reports a safety block on this increment
    pub block_reason: Option<String>,
}

/// A complete, non-streamed reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub block_reason: Option<String>,
}

/// Stream of reply increments
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<GenerationChunk, BackendError>> + Send>>;

/// Shared backend type for application state
pub type SharedBackend = Arc<dyn GenerationBackend>;

pub use factory::{BackendFactory, GeminiFactory};

/// The core trait that all generation backends must implement.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Human-readable name for logs
    fn name(&self) -> &'static str;

    /// Model identifier requests are sent to
    fn model(&self) -> &str;

    /// Generate a complete reply for the conversation ending in `turns`
    async fn generate(&self, turns: &[Turn]) -> Result<Reply, BackendError>;

    /// Stream the reply for the conversation ending in `turns`
    async fn generate_stream(&self, turns: &[Turn]) -> Result<ChunkStream, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, provider_status: Option<&str>, message: &str) -> BackendError {
        BackendError::Api {
            status,
            provider_status: provider_status.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_token_limit_from_message() {
        let err = api_error(
            400,
            Some("INVALID_ARGUMENT"),
            "The input token count (1200000) exceeds the maximum number of tokens allowed (1048576).",
        );
        assert_eq!(err.kind(), ErrorKind::TokenLimit);
    }

    #[test]
    fn test_structured_classification() {
        assert_eq!(
            api_error(403, Some("PERMISSION_DENIED"), "API key not valid").kind(),
            ErrorKind::Auth
        );
        assert_eq!(
            api_error(429, Some("RESOURCE_EXHAUSTED"), "Quota exceeded for metric").kind(),
            ErrorKind::RateLimited
        );
        assert_eq!(api_error(500, Some("INTERNAL"), "oops").kind(), ErrorKind::Api);
        assert_eq!(BackendError::Blocked("SAFETY".into()).kind(), ErrorKind::Blocked);
    }

    #[test]
    fn test_classify_error_text() {
        assert_eq!(
            classify_error_text("Token LIMIT reached"),
            Some(ErrorKind::TokenLimit)
        );
        assert_eq!(classify_error_text("limit exceeded"), None);
        assert_eq!(classify_error_text("invalid token"), None);
    }
}
