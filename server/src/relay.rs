//! Generation relay
//!
//! Drives one priming/generation exchange with the model and turns it into
//! [`RelayEvent`]s on a bounded channel. The SSE response drains the
//! channel, so every event reaches the browser in send order. Every exit
//! path except a vanished reader ends with [`RelayEvent::End`].

use std::path::PathBuf;

use futures_util::StreamExt;
use generation::{BackendError, ChatSession, ContextStrategy, ErrorKind, SharedBackend};
use tokio::sync::mpsc;

use crate::constants::relay::ACK_SNIPPET_CHARS;
use crate::prompt::{priming_message, PromptAssembler};
use crate::reference_files::ReferenceFile;

/// Sentinel telling the browser to stop listening
pub const STREAM_END: &str = "[STREAM_END]";

const NO_REFERENCE_FILES: &str = "No custom Kotlin files provided for context.";
const PREPARING_CONTEXT: &str = "Preparing custom code context for Gemini...";
const EMPTY_STREAM: &str = "No content received from Gemini stream for the generation request.";

/// One event on the generation stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// Generated text, newlines already escaped
    Text(String),
    Info(String),
    Error(String),
    End,
}

impl RelayEvent {
    /// Text event; every line break (`\n`, `\r\n` or a lone `\r`) becomes
    /// the two characters `\n`
    pub fn text(raw: &str) -> Self {
        Self::Text(
            raw.replace("\r\n", "\\n")
                .replace(['\r', '\n'], "\\n"),
        )
    }

    pub fn info(message: impl AsRef<str>) -> Self {
        Self::Info(single_line(message.as_ref()))
    }

    pub fn error(message: impl AsRef<str>) -> Self {
        Self::Error(single_line(message.as_ref()))
    }

    /// Wire payload of the `data:` line
    pub fn payload(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Info(message) => format!("[INFO] {}", message),
            Self::Error(message) => format!("[ERROR] {}", message),
            Self::End => STREAM_END.to_string(),
        }
    }
}

fn single_line(message: &str) -> String {
    message.replace(['\r', '\n'], " ")
}

/// How a relay run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    Done,
    Blocked,
    Error,
    /// The reader went away; nothing more was sent
    Disconnected,
}

/// Ingredients of one generation request
#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub node_json: String,
    pub svg: Option<String>,
    pub reference_files: Vec<ReferenceFile>,
    pub instructions: Option<String>,
}

/// Receiver dropped
struct Disconnected;

async fn send(tx: &mpsc::Sender<RelayEvent>, event: RelayEvent) -> Result<(), Disconnected> {
    tx.send(event).await.map_err(|_| Disconnected)
}

/// Emit a failure detected before the model is contacted
pub async fn send_preflight_error(tx: &mpsc::Sender<RelayEvent>, message: impl AsRef<str>) {
    log::warn!("Generation aborted: {}", message.as_ref());
    if send(tx, RelayEvent::error(message)).await.is_ok() {
        let _ = send(tx, RelayEvent::End).await;
    }
}

/// User-facing text for a failed model call
pub fn describe_failure(err: &BackendError, model: &str, reference_dir: &str) -> String {
    match err {
        BackendError::Blocked(reason) => {
            format!("Gemini API request was blocked. Reason: {}", reason)
        }
        _ if err.kind() == ErrorKind::TokenLimit => format!(
            "TOKEN LIMIT EXCEEDED. Type: {}: {}. This can happen if the total conversation \
             history (including custom code and Figma data) is too large. Please reduce the \
             amount of custom code in the '{}/' folder or simplify the Figma node.",
            err.type_name(),
            err,
            reference_dir
        ),
        _ => format!(
            "Error calling Gemini API ({}) - Type: {}: {}",
            model,
            err.type_name(),
            err
        ),
    }
}

fn outcome_for(err: &BackendError) -> RelayOutcome {
    if err.kind() == ErrorKind::Blocked {
        RelayOutcome::Blocked
    } else {
        RelayOutcome::Error
    }
}

/// One priming/generation exchange
pub struct GenerationRelay {
    backend: SharedBackend,
    template_path: PathBuf,
    strategy: ContextStrategy,
    /// Reference directory name used in remediation hints
    reference_dir: String,
}

impl GenerationRelay {
    pub fn new(
        backend: SharedBackend,
        template_path: PathBuf,
        strategy: ContextStrategy,
        reference_dir: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            template_path,
            strategy,
            reference_dir: reference_dir.into(),
        }
    }

    /// Run the exchange, pushing events into `tx`
    pub async fn run(self, request: GenerationRequest, tx: mpsc::Sender<RelayEvent>) -> RelayOutcome {
        let outcome = match self.drive(&request, &tx).await {
            Ok(outcome) => outcome,
            Err(Disconnected) => {
                log::info!("Generation stream reader disconnected");
                return RelayOutcome::Disconnected;
            }
        };

        if send(&tx, RelayEvent::End).await.is_err() {
            return RelayOutcome::Disconnected;
        }
        log::info!("Generation relay finished: {:?}", outcome);
        outcome
    }

    async fn fail(
        &self,
        tx: &mpsc::Sender<RelayEvent>,
        err: &BackendError,
    ) -> Result<RelayOutcome, Disconnected> {
        let message = describe_failure(err, self.backend.model(), &self.reference_dir);
        log::error!("{}", message);
        send(tx, RelayEvent::error(message)).await?;
        Ok(outcome_for(err))
    }

    async fn drive(
        &self,
        request: &GenerationRequest,
        tx: &mpsc::Sender<RelayEvent>,
    ) -> Result<RelayOutcome, Disconnected> {
        let assembler = match PromptAssembler::load(&self.template_path, self.strategy).await {
            Ok(assembler) => assembler,
            Err(e) => {
                log::error!("{}", e);
                send(tx, RelayEvent::error(e.to_string())).await?;
                return Ok(RelayOutcome::Error);
            }
        };

        let mut chat = ChatSession::new(self.backend.clone());
        let files = &request.reference_files;

        if files.is_empty() {
            send(tx, RelayEvent::info(NO_REFERENCE_FILES)).await?;
        } else if self.strategy == ContextStrategy::Primed {
            send(tx, RelayEvent::info(PREPARING_CONTEXT)).await?;
            log::info!(
                "Sending custom code context to {} ({} files)",
                self.backend.name(),
                files.len()
            );
            match chat.send_message(&priming_message(files)).await {
                Ok(reply) => {
                    let ack: String = reply.text.trim().chars().take(ACK_SNIPPET_CHARS).collect();
                    log::info!("Acknowledgement for context (snippet): {}...", ack);
                    send(
                        tx,
                        RelayEvent::info(format!(
                            "Custom code context sent. Gemini acknowledgement (snippet): {}...",
                            ack
                        )),
                    )
                    .await?;
                }
                Err(e) => return self.fail(tx, &e).await,
            }
        }

        let prompt = assembler.assemble(
            &request.node_json,
            request.svg.as_deref(),
            files,
            request.instructions.as_deref(),
        );

        log::info!("Sending main generation prompt to {}", chat.model());
        let mut stream = match chat.send_message_stream(&prompt).await {
            Ok(stream) => stream,
            Err(e) => return self.fail(tx, &e).await,
        };

        let mut reply = String::new();
        let mut increments = 0usize;
        let mut block_reason = None;

        while let Some(item) = stream.next().await {
            let chunk = match item {
                Ok(chunk) => chunk,
                Err(e) => return self.fail(tx, &e).await,
            };

            if let Some(text) = chunk.text.filter(|t| !t.is_empty()) {
                increments += 1;
                log::debug!("{}", text);
                send(tx, RelayEvent::text(&text)).await?;
                reply.push_str(&text);
            }

            if chunk.block_reason.is_some() {
                block_reason = chunk.block_reason;
                break;
            }
        }

        if let Some(reason) = block_reason {
            return self.fail(tx, &BackendError::Blocked(reason)).await;
        }

        if increments == 0 {
            log::warn!("No chunks received from stream for generation request");
            send(tx, RelayEvent::error(EMPTY_STREAM)).await?;
            return Ok(RelayOutcome::Error);
        }

        chat.record_reply(reply);
        Ok(RelayOutcome::Done)
    }
}
