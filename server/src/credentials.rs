//! Credential resolution: session override, then environment, then absent

use std::sync::Arc;

use serde::Serialize;

use crate::constants::env_vars;
use crate::session::Session;

/// The three secrets the tool needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    FigmaToken,
    GeminiApiKey,
    SlackWebhookUrl,
}

impl CredentialKind {
    pub const ALL: [CredentialKind; 3] = [
        CredentialKind::FigmaToken,
        CredentialKind::GeminiApiKey,
        CredentialKind::SlackWebhookUrl,
    ];

    /// Environment variable used when no session override exists
    pub fn env_var(self) -> &'static str {
        match self {
            Self::FigmaToken => env_vars::FIGMA_TOKEN,
            Self::GeminiApiKey => env_vars::GEMINI_API_KEY,
            Self::SlackWebhookUrl => env_vars::SLACK_WEBHOOK_URL,
        }
    }

    /// Human-readable name for messages
    pub fn label(self) -> &'static str {
        match self {
            Self::FigmaToken => "Figma token",
            Self::GeminiApiKey => "Gemini API key",
            Self::SlackWebhookUrl => "Slack Webhook URL",
        }
    }
}

/// Where a resolved credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    Session,
    Environment,
}

/// A resolved secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub kind: CredentialKind,
    pub value: String,
    pub source: CredentialSource,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pick the effective credential from an override and an environment lookup
pub fn resolve_with(
    kind: CredentialKind,
    session_override: Option<String>,
    env: impl Fn(&str) -> Option<String>,
) -> Option<Credential> {
    if let Some(value) = non_blank(session_override) {
        return Some(Credential {
            kind,
            value,
            source: CredentialSource::Session,
        });
    }

    non_blank(env(kind.env_var())).map(|value| Credential {
        kind,
        value,
        source: CredentialSource::Environment,
    })
}

/// Environment variable lookup used as the fallback source
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup against the process environment
pub fn process_env() -> EnvLookup {
    Arc::new(|name: &str| std::env::var(name).ok())
}

/// Resolve `kind` for the current request
pub async fn resolve(
    session: &Session,
    kind: CredentialKind,
    env: &EnvLookup,
) -> Option<Credential> {
    let session_override = session.credential_override(kind).await;
    let credential = resolve_with(kind, session_override, |name| env(name));
    if let Some(credential) = &credential {
        log::debug!("{} resolved from {:?}", credential.kind.label(), credential.source);
    }
    credential
}
