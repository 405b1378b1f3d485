//! Configuration types for the generation library

use serde::{Deserialize, Serialize};

/// Default Gemini model used for code generation
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro-preview-05-06";

/// Public Gemini REST endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Connection settings for a generation backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Model identifier (e.g., "gemini-2.5-pro-preview-05-06")
    pub model: String,
    /// API root without trailing slash
    pub base_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GenerationConfig {
    /// Override the model, keeping the default endpoint
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// How reference files reach the model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContextStrategy {
    /// Send the reference corpus once as a priming turn, then refer back to it
    /// from the main prompt. Relies on the model keeping earlier turns in context.
    #[default]
    Primed,
    /// Skip the priming turn and embed the reference corpus in the main prompt
    Inline,
}

impl ContextStrategy {
    /// Parse the strategy name used in configuration (`primed` / `inline`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "primed" => Some(Self::Primed),
            "inline" => Some(Self::Inline),
            _ => None,
        }
    }
}
