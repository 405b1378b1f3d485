//! Backend factories
//!
//! Credentials can change per request (a user may paste a key into the UI),
//! so callers hold a factory and build a backend when a key is known.

use std::sync::Arc;

use super::gemini::GeminiBackend;
use super::SharedBackend;
use crate::config::GenerationConfig;

/// Factory trait for creating backend instances
pub trait BackendFactory: Send + Sync {
    /// Create a backend that authenticates with `api_key`
    fn create(&self, api_key: &str) -> SharedBackend;

    /// Model identifier created backends will use
    fn model(&self) -> &str;
}

/// Factory for the Gemini backend
#[derive(Debug, Clone, Default)]
pub struct GeminiFactory {
    config: GenerationConfig,
}

impl GeminiFactory {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for GeminiFactory {
    fn create(&self, api_key: &str) -> SharedBackend {
        Arc::new(GeminiBackend::new(self.config.clone(), api_key))
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
