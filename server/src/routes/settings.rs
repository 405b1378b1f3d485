//! Credential override form

use axum::response::Redirect;
use axum::Form;
use serde::Deserialize;

use crate::credentials::CredentialKind;
use crate::session::{FlashCategory, Session};

#[derive(Debug, Default, Deserialize)]
pub struct SettingsForm {
    #[serde(default)]
    pub figma_token_ui_input: Option<String>,
    #[serde(default)]
    pub gemini_api_key_ui_input: Option<String>,
    #[serde(default)]
    pub slack_webhook_url_ui_input: Option<String>,
}

impl SettingsForm {
    fn value(&self, kind: CredentialKind) -> &str {
        let field = match kind {
            CredentialKind::FigmaToken => &self.figma_token_ui_input,
            CredentialKind::GeminiApiKey => &self.gemini_api_key_ui_input,
            CredentialKind::SlackWebhookUrl => &self.slack_webhook_url_ui_input,
        };
        field.as_deref().unwrap_or_default()
    }
}

/// Store or clear each override and flash what happened
pub async fn apply_settings(session: &Session, form: &SettingsForm) {
    for kind in CredentialKind::ALL {
        if session.set_credential_override(kind, form.value(kind)).await {
            log::info!("{} saved to session {}", kind.label(), session.id());
            session
                .flash(
                    FlashCategory::Success,
                    format!("{} saved to server session.", kind.label()),
                )
                .await;
        } else {
            session
                .flash(
                    FlashCategory::Info,
                    format!(
                        "{} cleared from server session. Will use environment variable if set.",
                        kind.label()
                    ),
                )
                .await;
        }
    }
}

pub async fn configure_settings(session: Session, Form(form): Form<SettingsForm>) -> Redirect {
    apply_settings(&session, &form).await;
    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;

    #[tokio::test]
    async fn test_apply_settings_sets_and_clears() {
        let (session, _) = SessionStore::new().load_or_create(None).await;
        session
            .set_credential_override(CredentialKind::SlackWebhookUrl, "https://hooks.example/old")
            .await;

        let form = SettingsForm {
            figma_token_ui_input: Some("figd_token".to_string()),
            gemini_api_key_ui_input: Some("  ".to_string()),
            slack_webhook_url_ui_input: None,
        };
        apply_settings(&session, &form).await;

        assert_eq!(
            session.credential_override(CredentialKind::FigmaToken).await.as_deref(),
            Some("figd_token")
        );
        assert!(session.credential_override(CredentialKind::GeminiApiKey).await.is_none());
        assert!(session.credential_override(CredentialKind::SlackWebhookUrl).await.is_none());

        let flashes = session.take_flashes().await;
        let categories: Vec<_> = flashes.iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![FlashCategory::Success, FlashCategory::Info, FlashCategory::Info]
        );
        assert_eq!(flashes[0].message, "Figma token saved to server session.");
        assert!(flashes[2].message.starts_with("Slack Webhook URL cleared"));
    }
}
