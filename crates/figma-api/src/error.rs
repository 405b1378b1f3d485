//! Error types for Figma operations

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using FigmaError
pub type Result<T> = std::result::Result<T, FigmaError>;

/// Errors that can occur while talking to Figma or saving its output
#[derive(Debug, Error)]
pub enum FigmaError {
    /// Connection-level failure (DNS, TLS, refused, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; detail is the API's `err`/`message` field or the raw body
    #[error("Figma API returned status {status}: {detail}")]
    Api { status: u16, detail: String },

    /// Body was expected to be JSON but was not
    #[error("Error decoding JSON from Figma API: {error}. Response: {snippet}...")]
    InvalidJson { error: String, snippet: String },

    /// The images endpoint answered but no URL could be resolved for the node
    #[error("Could not find image URL. API msg: {api_message}. Response: {snippet}...")]
    ImageNotFound { api_message: String, snippet: String },

    /// The rendered image could not be downloaded
    #[error("Image download failed with status {status}")]
    Download { status: u16 },

    /// Writing the snapshot to disk failed
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Truncate `text` to at most `max_chars` characters
pub fn snippet(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Extract a human-readable detail from an error body.
///
/// Figma error bodies look like `{"status":403,"err":"Invalid token"}`; some
/// endpoints use `message` instead. Anything else is returned trimmed.
pub fn api_error_detail(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let field = value
            .get("err")
            .and_then(|v| v.as_str())
            .or_else(|| value.get("message").and_then(|v| v.as_str()));
        if let Some(detail) = field {
            return detail.to_string();
        }
    }
    if trimmed.is_empty() {
        "(empty response body)".to_string()
    } else {
        trimmed.to_string()
    }
}
