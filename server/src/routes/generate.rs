//! SSE endpoint for code generation

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::AppState;
use crate::constants::relay::CHANNEL_CAPACITY;
use crate::credentials::CredentialKind;
use crate::reference_files;
use crate::relay::{send_preflight_error, GenerationRelay, GenerationRequest, RelayEvent};
use crate::session::Session;

#[derive(Debug, Default, Deserialize)]
pub struct GenerateQuery {
    #[serde(default)]
    pub additional_instructions: Option<String>,
}

/// Everything checked before the model is contacted
pub async fn prepare_relay(
    state: &AppState,
    session: &Session,
    instructions: Option<String>,
) -> Result<(GenerationRelay, GenerationRequest), String> {
    let Some(api_key) = state.credential(session, CredentialKind::GeminiApiKey).await else {
        return Err(format!(
            "Gemini API Key is not set. Please set it via UI or the {} environment variable.",
            CredentialKind::GeminiApiKey.env_var()
        ));
    };

    let snapshot = match session.snapshot().await {
        Some(snapshot) if snapshot.json_path.exists() => snapshot,
        _ => return Err("Figma JSON data not found in session. Please fetch data first.".into()),
    };

    let json_path = &snapshot.json_path;
    let node_json = tokio::fs::read_to_string(json_path)
        .await
        .map_err(|e| e.to_string())
        .and_then(|text| {
            serde_json::from_str::<serde_json::Value>(&text).map_err(|e| e.to_string())
        })
        .and_then(|value| figma_api::to_indented_json(&value).map_err(|e| e.to_string()))
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| format!("Error reading JSON file {}: {}", json_path.display(), e))?;

    let svg = match &snapshot.image_path {
        Some(path) => match tokio::fs::read_to_string(path).await {
            Ok(svg) => Some(svg),
            Err(e) => {
                log::warn!("Error reading SVG file {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    let config = &state.config;
    let reference_files =
        reference_files::scan(&config.reference_dir, &config.reference_extension).await;
    log::info!(
        "Generation request: {} reference file(s), svg {}",
        reference_files.len(),
        if svg.is_some() { "present" } else { "absent" }
    );

    let reference_label = config
        .reference_dir
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.reference_dir.display().to_string());

    let relay = GenerationRelay::new(
        state.backends.create(&api_key.value),
        config.template_path.clone(),
        config.context_strategy,
        reference_label,
    );
    let request = GenerationRequest {
        node_json,
        svg,
        reference_files,
        instructions: instructions.filter(|text| !text.trim().is_empty()),
    };
    Ok((relay, request))
}

pub async fn stream_generation(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<GenerateQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    session.set_generation_result(None).await;

    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
    match prepare_relay(&state, &session, query.additional_instructions).await {
        Ok((relay, request)) => {
            tokio::spawn(async move {
                relay.run(request, tx).await;
            });
        }
        Err(message) => {
            tokio::spawn(async move {
                send_preflight_error(&tx, message).await;
            });
        }
    }

    event_stream(rx)
}

/// One `data:` line per relay event, in channel order
fn event_stream(
    rx: mpsc::Receiver<RelayEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = ReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(Event::default().data(event.payload())));
    Sse::new(events)
}
