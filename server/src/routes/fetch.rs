//! Node fetch: metadata first, then the rendered image

use axum::extract::State;
use axum::response::Redirect;
use axum::Form;
use figma_api::{parse_figma_url, NodeFetcher};
use serde::Deserialize;

use super::AppState;
use crate::credentials::CredentialKind;
use crate::session::{FlashCategory, Session};

#[derive(Debug, Default, Deserialize)]
pub struct FetchForm {
    #[serde(default)]
    pub figma_url: Option<String>,
}

/// Run one fetch cycle, reporting every result as a flash message.
///
/// Metadata failure stops the cycle; image failure is only a warning.
pub async fn run_fetch(state: &AppState, session: &Session, figma_url: Option<&str>) {
    session.clear_fetch_state().await;

    let Some(figma_url) = figma_url.map(str::trim).filter(|u| !u.is_empty()) else {
        session
            .flash(FlashCategory::Error, "Figma URL is required.")
            .await;
        return;
    };

    let Some(node) = parse_figma_url(figma_url) else {
        session
            .flash(
                FlashCategory::Error,
                format!("Could not parse File Key or Node ID from URL: {}", figma_url),
            )
            .await;
        return;
    };
    session.set_last_node_id(&node.node_id).await;

    let Some(token) = state.credential(session, CredentialKind::FigmaToken).await else {
        session
            .flash(
                FlashCategory::Error,
                format!(
                    "Error: Figma Access Token is not set. Please set it via UI or the {} environment variable.",
                    CredentialKind::FigmaToken.env_var()
                ),
            )
            .await;
        return;
    };

    let fetcher = NodeFetcher::with_base_url(
        state.config.figma_base_url.as_str(),
        token.value,
        state.config.output.clone(),
    );

    match fetcher.fetch_metadata(&node).await {
        Ok(path) => {
            session
                .flash(
                    FlashCategory::Success,
                    format!("JSON for '{}' saved to '{}'.", node.node_id, path.display()),
                )
                .await;
            session.set_json_path(path).await;
        }
        Err(e) => {
            log::error!("Node JSON fetch failed for '{}': {}", node.node_id, e);
            session
                .flash(
                    FlashCategory::Error,
                    format!("Error fetching/saving JSON for '{}': {}", node.node_id, e),
                )
                .await;
            return;
        }
    }

    let format = state.config.output.image_format.to_uppercase();
    match fetcher.fetch_image(&node).await {
        Ok(path) => {
            session
                .flash(
                    FlashCategory::Success,
                    format!(
                        "{} image for '{}' saved to '{}'.",
                        format,
                        node.node_id,
                        path.display()
                    ),
                )
                .await;
            session.set_image_path(path).await;
        }
        Err(e) => {
            log::warn!("Image fetch failed for '{}': {}", node.node_id, e);
            session
                .flash(
                    FlashCategory::Warning,
                    format!(
                        "Could not fetch {} image for '{}': {}",
                        format, node.node_id, e
                    ),
                )
                .await;
        }
    }
}

pub async fn fetch_node(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<FetchForm>,
) -> Redirect {
    run_fetch(&state, &session, form.figma_url.as_deref()).await;
    Redirect::to("/")
}
