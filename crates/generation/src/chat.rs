//! Chat session - multi-turn exchange on top of a stateless backend
//!
//! The session owns the ordered turn history and replays it with every
//! request, so a priming turn sent earlier stays in the model's context for
//! later turns without the caller repeating it.

use crate::backend::{BackendError, ChunkStream, Reply, SharedBackend};
use crate::types::Turn;

/// A persistent exchange with one backend
pub struct ChatSession {
    backend: SharedBackend,
    /// Completed turns, oldest first
    history: Vec<Turn>,
    /// User turn whose streamed reply has not been recorded yet
    pending: Option<Turn>,
}

impl ChatSession {
    /// Start an empty exchange
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            history: Vec::new(),
            pending: None,
        }
    }

    /// Model identifier of the underlying backend
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Completed turns so far
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    fn turns_with(&self, message: &Turn) -> Vec<Turn> {
        let mut turns = self.history.clone();
        turns.push(message.clone());
        turns
    }

    /// Send a message and wait for the complete reply.
    ///
    /// On success both the message and the reply become part of the history.
    /// A blocked reply is returned as [`BackendError::Blocked`] and leaves the
    /// history untouched.
    pub async fn send_message(&mut self, text: &str) -> Result<Reply, BackendError> {
        let message = Turn::user(text);
        let reply = self.backend.generate(&self.turns_with(&message)).await?;

        if let Some(reason) = reply.block_reason {
            return Err(BackendError::Blocked(reason));
        }

        self.history.push(message);
        self.history.push(Turn::model(reply.text.clone()));
        Ok(reply)
    }

    /// Send a message and stream the reply.
    ///
    /// The message is held as pending until [`ChatSession::record_reply`]
    /// commits it together with the accumulated reply text.
    pub async fn send_message_stream(&mut self, text: &str) -> Result<ChunkStream, BackendError> {
        let message = Turn::user(text);
        let stream = self.backend.generate_stream(&self.turns_with(&message)).await?;
        self.pending = Some(message);
        Ok(stream)
    }

    /// Commit the pending streamed turn with its accumulated reply
    pub fn record_reply(&mut self, text: impl Into<String>) {
        if let Some(message) = self.pending.take() {
            self.history.push(message);
            self.history.push(Turn::model(text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GenerationBackend, GenerationChunk};
    use crate::types::Role;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    /// Echoes the number of turns it was given and remembers each request
    #[derive(Default)]
    struct RecordingBackend {
        requests: Mutex<Vec<Vec<Turn>>>,
        block: bool,
    }

    #[async_trait]
    impl GenerationBackend for RecordingBackend {
        fn name(&self) -> &'static str {
            "Recording"
        }

        fn model(&self) -> &str {
            "recording-model"
        }

        async fn generate(&self, turns: &[Turn]) -> Result<Reply, BackendError> {
            self.requests.lock().await.push(turns.to_vec());
            Ok(Reply {
                text: format!("seen {}", turns.len()),
                block_reason: self.block.then(|| "SAFETY".to_string()),
            })
        }

        async fn generate_stream(&self, turns: &[Turn]) -> Result<ChunkStream, BackendError> {
            self.requests.lock().await.push(turns.to_vec());
            let chunks = vec![Ok(GenerationChunk {
                text: Some("streamed".to_string()),
                block_reason: None,
            })];
            Ok(Box::pin(futures_util::stream::iter(chunks)))
        }
    }

    #[tokio::test]
    async fn test_priming_turn_stays_in_context() {
        let backend = Arc::new(RecordingBackend::default());
        let mut chat = ChatSession::new(backend.clone());

        let ack = chat.send_message("reference files").await.unwrap();
        assert_eq!(ack.text, "seen 1");
        assert_eq!(chat.history().len(), 2);

        let stream = chat.send_message_stream("generate").await.unwrap();
        let chunks: Vec<_> = stream.collect().await;
        assert_eq!(chunks.len(), 1);
        chat.record_reply("streamed");

        let requests = backend.requests.lock().await;
        assert_eq!(requests[1].len(), 3);
        assert_eq!(requests[1][0].text, "reference files");
        assert_eq!(requests[1][1].role, Role::Model);
        assert_eq!(chat.history().len(), 4);
        assert_eq!(chat.history()[3], Turn::model("streamed"));
    }

    #[tokio::test]
    async fn test_blocked_reply_not_recorded() {
        let backend = Arc::new(RecordingBackend {
            block: true,
            ..Default::default()
        });
        let mut chat = ChatSession::new(backend);

        let err = chat.send_message("context").await.unwrap_err();
        assert!(matches!(err, BackendError::Blocked(ref r) if r == "SAFETY"));
        assert!(chat.history().is_empty());
    }

    #[test]
    fn test_record_without_pending_is_noop() {
        let mut chat = ChatSession::new(Arc::new(RecordingBackend::default()));
        chat.record_reply("orphan");
        assert!(chat.history().is_empty());
        assert_eq!(chat.model(), "recording-model");
    }
}
