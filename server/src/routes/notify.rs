//! Save the finished generation and relay it to Slack

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::credentials::CredentialKind;
use crate::error::AppError;
use crate::notify::NotifyOutcome;
use crate::session::{FlashCategory, FlashMessage, Session};

#[derive(Debug, Default, Deserialize)]
pub struct CodePayload {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub status: &'static str,
    pub message: String,
    pub flash_messages: Vec<FlashMessage>,
}

#[derive(Debug, Serialize)]
pub struct ResendResponse {
    pub status: &'static str,
    pub message: String,
}

/// Notify Slack with the session's webhook and node id
async fn notify_slack(state: &AppState, session: &Session, code: &str) -> NotifyOutcome {
    let webhook = state
        .credential(session, CredentialKind::SlackWebhookUrl)
        .await;
    let node_id = session.last_node_id().await;
    let outcome = state
        .notifier
        .notify(
            code,
            webhook.as_ref().map(|c| c.value.as_str()),
            node_id.as_deref(),
        )
        .await;
    log::debug!(
        "Slack notification (sent: {}): {}",
        outcome.is_sent(),
        outcome.message()
    );
    outcome
}

/// Store `code` as the session's generation result, then notify Slack
pub async fn save_code(state: &AppState, session: &Session, code: String) -> SaveResponse {
    session.set_generation_result(Some(code.clone())).await;
    let outcome = notify_slack(state, session, &code).await;

    let mut flash_messages = vec![FlashMessage::new(
        FlashCategory::Success,
        "Generated code saved to session.",
    )];
    flash_messages.push(match outcome {
        NotifyOutcome::Sent(message) => FlashMessage::new(FlashCategory::Success, message),
        NotifyOutcome::Failed(message) => FlashMessage::new(FlashCategory::Error, message),
        NotifyOutcome::NotConfigured => FlashMessage::new(
            FlashCategory::Warning,
            "Slack Webhook URL not configured. Skipping Slack notification.",
        ),
    });

    SaveResponse {
        status: "success",
        message: "Code processed.".to_string(),
        flash_messages,
    }
}

pub async fn save_and_notify(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CodePayload>, JsonRejection>,
) -> Result<Json<SaveResponse>, AppError> {
    let Json(payload) = payload?;
    let code = payload
        .code
        .ok_or_else(|| AppError::BadRequest("No code provided.".to_string()))?;
    Ok(Json(save_code(&state, &session, code).await))
}

/// Send `code` again without touching the session
pub async fn resend_code(
    state: &AppState,
    session: &Session,
    code: Option<String>,
) -> Result<ResendResponse, AppError> {
    let code = code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("No code provided to resend.".to_string()))?;

    match notify_slack(state, session, &code).await {
        NotifyOutcome::Sent(message) => Ok(ResendResponse {
            status: "success",
            message: format!("Code resent to Slack. ({})", message),
        }),
        NotifyOutcome::NotConfigured => Ok(ResendResponse {
            status: "warning",
            message: "Slack Webhook URL not configured. Cannot resend.".to_string(),
        }),
        NotifyOutcome::Failed(message) => Err(AppError::Notification(format!(
            "Failed to resend to Slack: {}",
            message
        ))),
    }
}

pub async fn resend(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CodePayload>, JsonRejection>,
) -> Result<Json<ResendResponse>, AppError> {
    let Json(payload) = payload?;
    resend_code(&state, &session, payload.code).await.map(Json)
}
