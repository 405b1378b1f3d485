//! Application configuration
//!
//! Built once at startup from constants and environment variables.
//! Credentials are not part of it; they are resolved per request.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figma_api::OutputConfig;
use generation::{ContextStrategy, GenerationConfig};

use crate::constants::{env_vars, network, output, prompt, reference, slack};

/// Slack webhook settings
#[derive(Debug, Clone)]
pub struct SlackConfig {
    /// Maximum characters of code in one message
    pub max_code_chars: usize,
    /// Webhook POST timeout
    pub timeout: Duration,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            max_code_chars: slack::MAX_CODE_CHARS,
            timeout: Duration::from_secs(slack::TIMEOUT_SECS),
        }
    }
}

/// Effective configuration of the running server
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Where fetched node artifacts are written
    pub output: OutputConfig,
    /// Figma API root
    pub figma_base_url: String,
    /// Directory of reference source files
    pub reference_dir: PathBuf,
    /// Extension (without dot) of reference source files
    pub reference_extension: String,
    /// Main prompt template
    pub template_path: PathBuf,
    /// Model and endpoint
    pub generation: GenerationConfig,
    /// How reference files reach the model
    pub context_strategy: ContextStrategy,
    pub slack: SlackConfig,
}

impl AppConfig {
    /// Load from the process environment, rooted at the current directory
    pub fn from_env() -> Self {
        let working_dir = std::env::current_dir().unwrap_or_else(|e| {
            log::warn!("Failed to read current directory, using '.': {}", e);
            PathBuf::from(".")
        });
        Self::from_lookup(&working_dir, |name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (used by tests)
    pub fn from_lookup(working_dir: &Path, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = match lookup(network::PORT_ENV_VAR) {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!(
                    "Invalid {} value '{}', using default port {}",
                    network::PORT_ENV_VAR,
                    raw,
                    network::DEFAULT_PORT
                );
                network::DEFAULT_PORT
            }),
            None => network::DEFAULT_PORT,
        };

        let generation = match lookup(env_vars::GEMINI_MODEL).filter(|m| !m.trim().is_empty()) {
            Some(model) => GenerationConfig::with_model(model.trim()),
            None => GenerationConfig::default(),
        };

        let context_strategy = match lookup(env_vars::CONTEXT_STRATEGY) {
            Some(raw) => ContextStrategy::parse(&raw).unwrap_or_else(|| {
                log::warn!(
                    "Unknown {} value '{}', using primed",
                    env_vars::CONTEXT_STRATEGY,
                    raw
                );
                ContextStrategy::default()
            }),
            None => ContextStrategy::default(),
        };

        Self {
            host: network::HOST.to_string(),
            port,
            output: OutputConfig {
                dir: working_dir.to_path_buf(),
                json_filename: output::JSON_FILENAME.to_string(),
                image_prefix: output::IMAGE_FILE_PREFIX.to_string(),
                image_format: output::IMAGE_FORMAT.to_string(),
            },
            figma_base_url: figma_api::fetcher::DEFAULT_BASE_URL.to_string(),
            reference_dir: working_dir.join(reference::DIR),
            reference_extension: reference::EXTENSION.to_string(),
            template_path: working_dir.join(prompt::TEMPLATE_PATH),
            generation,
            context_strategy,
            slack: SlackConfig::default(),
        }
    }
}
