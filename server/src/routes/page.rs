//! The single page and the state it renders

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use serde::Serialize;

use super::AppState;
use crate::constants::network;
use crate::credentials::{CredentialKind, CredentialSource};
use crate::session::{FlashMessage, NodeSnapshot, Session};

const INDEX_HTML: &str = include_str!("../../assets/index.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Session,
    Environment,
    Unset,
}

impl From<Option<CredentialSource>> for CredentialStatus {
    fn from(source: Option<CredentialSource>) -> Self {
        match source {
            Some(CredentialSource::Session) => Self::Session,
            Some(CredentialSource::Environment) => Self::Environment,
            None => Self::Unset,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CredentialInfo {
    pub kind: CredentialKind,
    pub label: &'static str,
    pub env_var: &'static str,
    pub status: CredentialStatus,
}

#[derive(Debug, Serialize)]
pub struct OutputNames {
    pub json_filename: String,
    pub image_prefix: String,
    pub image_format: String,
}

/// Everything the page needs to render
#[derive(Debug, Serialize)]
pub struct PageState {
    pub flashes: Vec<FlashMessage>,
    pub credentials: Vec<CredentialInfo>,
    pub snapshot: Option<NodeSnapshot>,
    pub last_node_id: Option<String>,
    pub generation_result: Option<String>,
    pub model: String,
    pub reference_dir: String,
    pub reference_extension: String,
    pub output: OutputNames,
    pub port_env_var: &'static str,
    pub default_port: u16,
}

/// Snapshot the session for rendering; drains queued flashes
pub async fn page_state(state: &AppState, session: &Session) -> PageState {
    let mut credentials = Vec::with_capacity(CredentialKind::ALL.len());
    for kind in CredentialKind::ALL {
        let source = state.credential(session, kind).await.map(|c| c.source);
        credentials.push(CredentialInfo {
            kind,
            label: kind.label(),
            env_var: kind.env_var(),
            status: source.into(),
        });
    }

    let config = &state.config;
    PageState {
        flashes: session.take_flashes().await,
        credentials,
        snapshot: session.snapshot().await,
        last_node_id: session.last_node_id().await,
        generation_result: session.generation_result().await,
        model: state.backends.model().to_string(),
        reference_dir: config.reference_dir.display().to_string(),
        reference_extension: config.reference_extension.clone(),
        output: OutputNames {
            json_filename: config.output.json_filename.clone(),
            image_prefix: config.output.image_prefix.clone(),
            image_format: config.output.image_format.clone(),
        },
        port_env_var: network::PORT_ENV_VAR,
        default_port: network::DEFAULT_PORT,
    }
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn state(State(state): State<AppState>, session: Session) -> Json<PageState> {
    Json(page_state(&state, &session).await)
}
