//! HTTP routes
//!
//! | Route | Handler |
//! |---|---|
//! | `GET /` | [`page::index`] |
//! | `GET /api/state` | [`page::state`] |
//! | `POST /configure_settings` | [`settings::configure_settings`] |
//! | `POST /fetch` | [`fetch::fetch_node`] |
//! | `GET /stream_compose_generation` | [`generate::stream_generation`] |
//! | `POST /save_generated_code_and_notify_slack` | [`notify::save_and_notify`] |
//! | `POST /resend_to_slack` | [`notify::resend`] |

pub mod fetch;
pub mod generate;
pub mod notify;
pub mod page;
pub mod settings;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use generation::{BackendFactory, GeminiFactory};

use crate::config::AppConfig;
use crate::credentials::{self, Credential, CredentialKind, EnvLookup};
use crate::notify::SlackNotifier;
use crate::session::{session_layer, Session, SessionStore};

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub sessions: SessionStore,
    /// Builds a generation backend once the API key is known
    pub backends: Arc<dyn BackendFactory>,
    pub notifier: SlackNotifier,
    /// Fallback source for credentials without a session override
    pub env: EnvLookup,
}

impl AppState {
    /// State backed by Gemini and the process environment
    pub fn new(config: AppConfig) -> Self {
        let backends = Arc::new(GeminiFactory::new(config.generation.clone()));
        Self::with_parts(config, backends, credentials::process_env())
    }

    pub fn with_parts(
        config: AppConfig,
        backends: Arc<dyn BackendFactory>,
        env: EnvLookup,
    ) -> Self {
        Self {
            notifier: SlackNotifier::new(&config.slack),
            config: Arc::new(config),
            sessions: SessionStore::new(),
            backends,
            env,
        }
    }

    /// Effective credential for this request
    pub async fn credential(&self, session: &Session, kind: CredentialKind) -> Option<Credential> {
        credentials::resolve(session, kind, &self.env).await
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(page::index))
        .route("/api/state", get(page::state))
        .route("/configure_settings", post(settings::configure_settings))
        .route("/fetch", post(fetch::fetch_node))
        .route("/stream_compose_generation", get(generate::stream_generation))
        .route(
            "/save_generated_code_and_notify_slack",
            post(notify::save_and_notify),
        )
        .route("/resend_to_slack", post(notify::resend))
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_layer,
        ))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::path::Path;

    /// State rooted at `dir` with an empty environment
    pub fn state_in(dir: &Path) -> AppState {
        let config = AppConfig::from_lookup(dir, |_| None);
        let backends = Arc::new(GeminiFactory::new(config.generation.clone()));
        AppState::with_parts(config, backends, Arc::new(|_: &str| None))
    }

    pub async fn new_session(state: &AppState) -> Session {
        state.sessions.load_or_create(None).await.0
    }
}
