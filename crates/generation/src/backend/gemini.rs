//! Gemini backend implementation
//!
//! Talks to the `generativelanguage` REST API. Non-streamed turns use
//! `generateContent`; streamed turns use `streamGenerateContent?alt=sse`,
//! whose body is a server-sent event stream of JSON responses.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use super::{BackendError, ChunkStream, GenerationBackend, GenerationChunk, Reply};
use crate::config::GenerationConfig;
use crate::types::{ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse, Turn};

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini backend using the public REST API
pub struct GeminiBackend {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    /// Model and endpoint
    config: GenerationConfig,
    /// API key sent with every request
    api_key: String,
}

impl GeminiBackend {
    /// Create a new Gemini backend
    pub fn new(config: GenerationConfig, api_key: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            config,
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            method
        )
    }

    async fn post(&self, url: &str, turns: &[Turn]) -> Result<reqwest::Response, BackendError> {
        if self.api_key.trim().is_empty() {
            return Err(BackendError::Config("Gemini API key is empty".to_string()));
        }

        let response = self
            .http_client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateContentRequest::from_turns(turns))
            .send()
            .await
            .map_err(BackendError::Http)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        Ok(response)
    }
}

/// Build an API error from a non-success body, using the structured envelope when present
fn api_error(status: u16, body: &str) -> BackendError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => BackendError::Api {
            status: envelope.error.code.unwrap_or(status),
            provider_status: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => BackendError::Api {
            status,
            provider_status: None,
            message: body.trim().to_string(),
        },
    }
}

/// Parse one SSE line; `None` for blank lines, comments and non-data fields
fn parse_sse_line(line: &str) -> Option<Result<GenerationChunk, BackendError>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let data = line.strip_prefix("data:")?.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(value) => value,
        Err(e) => {
            return Some(Err(BackendError::Decode(format!(
                "Invalid stream payload: {}",
                e
            ))))
        }
    };

    if value.get("error").is_some() {
        return Some(Err(api_error(0, data)));
    }

    let response: GenerateContentResponse = match serde_json::from_value(value) {
        Ok(response) => response,
        Err(e) => {
            return Some(Err(BackendError::Decode(format!(
                "Unexpected stream payload: {}",
                e
            ))))
        }
    };

    let text = response.text();
    Some(Ok(GenerationChunk {
        text: if text.is_empty() { None } else { Some(text) },
        block_reason: response.block_reason(),
    }))
}

struct SseState<S> {
    body: S,
    buffer: Vec<u8>,
    pending: VecDeque<Result<GenerationChunk, BackendError>>,
    finished: bool,
}

impl<S> SseState<S> {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(item) = parse_sse_line(&String::from_utf8_lossy(&line)) {
                self.pending.push_back(item);
            }
        }
    }

    fn drain_rest(&mut self) {
        let rest = std::mem::take(&mut self.buffer);
        if let Some(item) = parse_sse_line(&String::from_utf8_lossy(&rest)) {
            self.pending.push_back(item);
        }
    }
}

/// Turn a raw SSE byte stream into reply increments.
///
/// Network chunks do not align with lines, so bytes are buffered until a
/// newline arrives. Ends after the first transport error.
fn parse_sse_stream<S>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<Vec<u8>, BackendError>> + Send + Unpin + 'static,
{
    let state = SseState {
        body,
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    let stream = futures_util::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    state.buffer.extend_from_slice(&bytes);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state.buffer.clear();
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    state.drain_rest();
                }
            }
        }
    });

    Box::pin(stream)
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, turns: &[Turn]) -> Result<Reply, BackendError> {
        let url = self.endpoint("generateContent");
        log::debug!("Gemini generateContent with {} turns", turns.len());

        let response: GenerateContentResponse = self
            .post(&url, turns)
            .await?
            .json()
            .await
            .map_err(|e| BackendError::Decode(format!("Failed to parse response: {}", e)))?;

        Ok(Reply {
            text: response.text(),
            block_reason: response.block_reason(),
        })
    }

    async fn generate_stream(&self, turns: &[Turn]) -> Result<ChunkStream, BackendError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        log::debug!("Gemini streamGenerateContent with {} turns", turns.len());

        let response = self.post(&url, turns).await?;
        let body = response
            .bytes_stream()
            .map(|result| result.map(|bytes| bytes.to_vec()).map_err(BackendError::Http));

        Ok(parse_sse_stream(Box::pin(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ErrorKind;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> GeminiBackend {
        let config = GenerationConfig {
            model: "test-model".to_string(),
            base_url: server.uri(),
        };
        GeminiBackend::new(config, "test-key")
    }

    fn chunk_line(text: &str) -> String {
        let payload = serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        });
        format!("data: {}\r\n\r\n", payload)
    }

    #[test]
    fn test_backend_name() {
        let backend = GeminiBackend::new(GenerationConfig::default(), "key");
        assert_eq!(backend.name(), "Gemini");
        assert_eq!(backend.model(), crate::config::DEFAULT_MODEL);
    }

    #[test]
    fn test_parse_sse_line_skips_non_data() {
        assert!(parse_sse_line("").is_none());
        assert!(parse_sse_line(": keep-alive").is_none());
        assert!(parse_sse_line("event: message").is_none());
        assert!(parse_sse_line("data: [DONE]").is_none());
    }

    #[test]
    fn test_parse_sse_line_error_payload() {
        let line = r#"data: {"error":{"code":400,"message":"The input token count exceeds the limit","status":"INVALID_ARGUMENT"}}"#;
        let err = parse_sse_line(line).unwrap().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TokenLimit);
    }

    #[tokio::test]
    async fn test_stream_reassembles_split_lines() {
        let line = chunk_line("val x = 1\n");
        let (head, tail) = line.split_at(17);
        let body = futures_util::stream::iter(vec![
            Ok(head.as_bytes().to_vec()),
            Ok(tail.as_bytes().to_vec()),
            Ok(chunk_line("val y = 2").into_bytes()),
        ]);

        let chunks: Vec<_> = parse_sse_stream(body).collect().await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0].as_ref().unwrap().text.as_deref(),
            Some("val x = 1\n")
        );
        assert_eq!(chunks[1].as_ref().unwrap().text.as_deref(), Some("val y = 2"));
    }

    #[tokio::test]
    async fn test_stream_without_trailing_newline() {
        let line = chunk_line("tail");
        let body = futures_util::stream::iter(vec![Ok(line.trim_end().as_bytes().to_vec())]);
        let chunks: Vec<_> = parse_sse_stream(body).collect().await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].as_ref().unwrap().text.as_deref(), Some("tail"));
    }

    #[tokio::test]
    async fn test_generate_sends_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{ "content": { "parts": [{ "text": "Acknowledged." }] } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let reply = backend.generate(&[Turn::user("context")]).await.unwrap();
        assert_eq!(reply.text, "Acknowledged.");
        assert!(reply.block_reason.is_none());

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "context");
    }

    #[tokio::test]
    async fn test_generate_stream_over_http() {
        let server = MockServer::start().await;
        let body = format!("{}{}", chunk_line("@Composable\n"), chunk_line("fun Card() {}"));
        Mock::given(method("POST"))
            .and(path("/models/test-model:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let stream = backend.generate_stream(&[Turn::user("go")]).await.unwrap();
        let text: String = stream
            .filter_map(|chunk| async move { chunk.ok().and_then(|c| c.text) })
            .collect()
            .await;
        assert_eq!(text, "@Composable\nfun Card() {}");
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend.generate(&[Turn::user("hi")]).await.unwrap_err();
        match &err {
            BackendError::Api {
                status,
                provider_status,
                message,
            } => {
                assert_eq!(*status, 400);
                assert_eq!(provider_status.as_deref(), Some("INVALID_ARGUMENT"));
                assert!(message.contains("API key not valid"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[tokio::test]
    async fn test_empty_key_is_config_error() {
        let backend = GeminiBackend::new(GenerationConfig::default(), "  ");
        let err = backend.generate(&[Turn::user("hi")]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
