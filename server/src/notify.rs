//! Slack notification of generated code
//!
//! The generated text is cleaned of surrounding code fences, elided in the
//! middle when it exceeds the per-message budget, and posted to an incoming
//! webhook as a single `text` field.

use std::time::Duration;

use serde_json::json;

use crate::config::SlackConfig;
use crate::constants::reference::LANGUAGE;

/// Inserted between head and tail of over-long code
pub const ELISION_MARKER: &str = "\n...\n...(code truncated for Slack message)\n...\n";
/// Used instead when the budget cannot fit head, tail and the full marker
pub const SHORT_MARKER: &str = "... (code truncated)";
/// Minimum room left for head and tail before falling back to [`SHORT_MARKER`]
const MIN_CONTEXT_CHARS: usize = 100;

const HEADER: &str = "Figma to Jetpack Compose Generation Complete!";
const TRUNCATED_NOTE: &str = "(Full code generated, but truncated for this Slack message due to length.)";
pub const NOT_CONFIGURED: &str = "Slack Webhook URL not configured.";

/// Result of one notification attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent(String),
    Failed(String),
    /// No webhook URL; nothing was sent
    NotConfigured,
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Sent(message) | Self::Failed(message) => message,
            Self::NotConfigured => NOT_CONFIGURED,
        }
    }
}

/// Remove a leading fence (with optional language tag) or a bare language
/// word, and a trailing fence.
pub fn clean_generated_code(text: &str) -> String {
    let mut code = text.trim();

    if let Some(rest) = code.strip_prefix("```") {
        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(rest.len());
        let after_tag = &rest[tag_len..];
        code = if after_tag.is_empty() || after_tag.starts_with(char::is_whitespace) {
            after_tag.trim()
        } else {
            rest.trim()
        };
    } else if let Some(rest) = code.strip_prefix(LANGUAGE) {
        code = rest.trim();
    }

    if let Some(rest) = code.strip_suffix("```") {
        code = rest.trim();
    }
    code.to_string()
}

/// Fit `code` into `budget` characters.
///
/// Returns the text to send and whether anything was cut.
pub fn truncate_for_slack(code: &str, budget: usize) -> (String, bool) {
    let len = code.chars().count();
    if len <= budget {
        return (code.to_string(), false);
    }

    let marker_len = ELISION_MARKER.chars().count();
    if budget > marker_len + MIN_CONTEXT_CHARS {
        let half = (budget - marker_len) / 2;
        let head: String = code.chars().take(half).collect();
        let tail: String = code.chars().skip(len - half).collect();
        return (format!("{}{}{}", head, ELISION_MARKER, tail), true);
    }

    // Budgets below the marker itself get a clipped marker and no code
    let marker: String = SHORT_MARKER.chars().take(budget).collect();
    let keep = budget - marker.chars().count();
    let head: String = code.chars().take(keep).collect();
    (format!("{}{}", head, marker), true)
}

/// Full Slack message text for `code` generated from `node_id`
pub fn build_message(code: &str, node_id: Option<&str>, budget: usize) -> String {
    let cleaned = clean_generated_code(code);
    let (body, truncated) = truncate_for_slack(&cleaned, budget);

    let mut header = format!("{}\nNode ID: {}", HEADER, node_id.unwrap_or("N/A"));
    if truncated {
        header.push('\n');
        header.push_str(TRUNCATED_NOTE);
    }
    format!("{}\n```{}\n{}\n```", header, LANGUAGE, body)
}

/// Posts generated code to an incoming webhook
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    http_client: reqwest::Client,
    max_code_chars: usize,
    timeout: Duration,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            max_code_chars: config.max_code_chars,
            timeout: config.timeout,
        }
    }

    /// Send `code` to `webhook_url`; no URL means no request at all
    pub async fn notify(
        &self,
        code: &str,
        webhook_url: Option<&str>,
        node_id: Option<&str>,
    ) -> NotifyOutcome {
        let Some(url) = webhook_url.filter(|u| !u.trim().is_empty()) else {
            log::info!("Slack Webhook URL not configured. Skipping Slack notification.");
            return NotifyOutcome::NotConfigured;
        };

        let text = build_message(code, node_id, self.max_code_chars);
        let result = self
            .http_client
            .post(url)
            .timeout(self.timeout)
            .json(&json!({ "text": text }))
            .send()
            .await
            .and_then(|response| response.error_for_status());

        match result {
            Ok(_) => {
                log::info!("Successfully sent message to Slack");
                NotifyOutcome::Sent("Message sent to Slack.".to_string())
            }
            Err(e) => {
                let message = format!("Error sending message to Slack: {}", e);
                log::error!("{}", message);
                NotifyOutcome::Failed(message)
            }
        }
    }
}
