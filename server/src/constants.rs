//! Application-wide constants
//!
//! Single source of truth for file names, environment variable names and
//! other fixed values.

/// Network configuration
pub mod network {
    /// Default port the web UI listens on
    pub const DEFAULT_PORT: u16 = 5006;
    /// Environment variable overriding the port
    pub const PORT_ENV_VAR: &str = "FIGMA_COMPOSE_PORT";
    /// Bind address
    pub const HOST: &str = "0.0.0.0";
}

/// Environment variables holding credentials and model settings
pub mod env_vars {
    pub const FIGMA_TOKEN: &str = "FIGMA_ACCESS_TOKEN";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const SLACK_WEBHOOK_URL: &str = "SLACK_WEBHOOK_URL";
    pub const GEMINI_MODEL: &str = "GEMINI_MODEL";
    pub const CONTEXT_STRATEGY: &str = "GENERATION_CONTEXT_STRATEGY";
}

/// Output file naming
pub mod output {
    /// Node JSON, overwritten on every fetch
    pub const JSON_FILENAME: &str = "figma_node_data.json";
    /// Prefix of the image file; the sanitized node id follows
    pub const IMAGE_FILE_PREFIX: &str = "figma_node_image_";
    /// Requested export format and file extension
    pub const IMAGE_FORMAT: &str = "svg";
}

/// Reference code offered to the model
pub mod reference {
    /// Directory scanned (non-recursively) on every generation request
    pub const DIR: &str = "common";
    /// Extension of files picked up from the directory
    pub const EXTENSION: &str = "kt";
    /// Fence language tag for reference files and generated code
    pub const LANGUAGE: &str = "kotlin";
}

/// Prompt template location
pub mod prompt {
    pub const TEMPLATE_PATH: &str = "prompts/compose_prompt.txt";
}

/// Generation relay settings
pub mod relay {
    /// Capacity of the producer/consumer channel feeding the SSE response
    pub const CHANNEL_CAPACITY: usize = 32;
    /// Characters of the priming acknowledgement echoed to the client
    pub const ACK_SNIPPET_CHARS: usize = 150;
}

/// Slack notification settings
pub mod slack {
    /// Maximum characters of code placed in one Slack message
    pub const MAX_CODE_CHARS: usize = 2800;
    /// Request timeout for the webhook POST
    pub const TIMEOUT_SECS: u64 = 10;
}

/// Session cookie
pub mod session {
    pub const COOKIE_NAME: &str = "figma_compose_session";
}
