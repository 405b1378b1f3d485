//! Per-browser session state
//!
//! Sessions are kept in memory for the life of the process and identified by
//! a random id carried in an `HttpOnly` cookie. The [`session_layer`]
//! middleware attaches a [`Session`] handle to every request; handlers take
//! it as an extractor and use the typed accessors below.
//!
//! A session only occupies the store once something is written to it, so
//! read-only requests (page loads, cookie-less clients) leave no entry.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::constants::session::COOKIE_NAME;
use crate::credentials::CredentialKind;

/// Severity of a flash message, also its CSS class in the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Info,
    Warning,
    Error,
}

/// One-shot message shown on the next page render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlashMessage {
    pub category: FlashCategory,
    pub message: String,
}

impl FlashMessage {
    pub fn new(category: FlashCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Paths of the artifacts fetched for one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub json_path: PathBuf,
    pub image_path: Option<PathBuf>,
}

/// Everything stored for one browser
#[derive(Debug, Clone, Default)]
pub struct SessionData {
    credentials: HashMap<CredentialKind, String>,
    json_path: Option<PathBuf>,
    image_path: Option<PathBuf>,
    last_node_id: Option<String>,
    generation_result: Option<String>,
    flashes: Vec<FlashMessage>,
}

/// In-memory session storage shared by all requests
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionData>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for the session named by the cookie, or for a fresh id.
    ///
    /// Nothing is inserted here; the entry appears on the first write. The
    /// flag is `true` when a fresh id was issued and the cookie must be set.
    pub async fn load_or_create(&self, id: Option<Uuid>) -> (Session, bool) {
        match id {
            Some(id) => (self.handle(id), false),
            None => {
                let id = Uuid::new_v4();
                log::debug!("Issued session id {}", id);
                (self.handle(id), true)
            }
        }
    }

    fn handle(&self, id: Uuid) -> Session {
        Session {
            id,
            store: self.clone(),
        }
    }
}

/// Handle to one browser's session
#[derive(Clone)]
pub struct Session {
    id: Uuid,
    store: SessionStore,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }

    async fn read<R>(&self, f: impl FnOnce(&SessionData) -> R) -> R {
        let sessions = self.store.sessions.read().await;
        match sessions.get(&self.id) {
            Some(data) => f(data),
            None => f(&SessionData::default()),
        }
    }

    async fn write<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut sessions = self.store.sessions.write().await;
        if !sessions.contains_key(&self.id) {
            log::debug!("Storing session {} ({} stored)", self.id, sessions.len() + 1);
        }
        f(sessions.entry(self.id).or_default())
    }

    /// Like `write`, but a session with no entry stays absent
    async fn update<R: Default>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut sessions = self.store.sessions.write().await;
        sessions.get_mut(&self.id).map(f).unwrap_or_default()
    }

    // ─── CREDENTIALS ────────────────────────────────────────────────

    /// Override saved for `kind`, if any
    pub async fn credential_override(&self, kind: CredentialKind) -> Option<String> {
        self.read(|data| data.credentials.get(&kind).cloned()).await
    }

    /// Store a non-blank value, or remove the override when blank.
    ///
    /// Returns `true` when a value was stored.
    pub async fn set_credential_override(&self, kind: CredentialKind, value: &str) -> bool {
        let value = value.trim();
        self.write(|data| {
            if value.is_empty() {
                data.credentials.remove(&kind);
                false
            } else {
                data.credentials.insert(kind, value.to_string());
                true
            }
        })
        .await
    }

    // ─── NODE SNAPSHOT ──────────────────────────────────────────────

    /// Forget the previous fetch and any saved generation result
    pub async fn clear_fetch_state(&self) {
        self.update(|data| {
            data.json_path = None;
            data.image_path = None;
            data.last_node_id = None;
            data.generation_result = None;
        })
        .await
    }

    pub async fn set_last_node_id(&self, node_id: &str) {
        self.write(|data| data.last_node_id = Some(node_id.to_string()))
            .await
    }

    pub async fn last_node_id(&self) -> Option<String> {
        self.read(|data| data.last_node_id.clone()).await
    }

    pub async fn set_json_path(&self, path: PathBuf) {
        self.write(|data| data.json_path = Some(path)).await
    }

    pub async fn set_image_path(&self, path: PathBuf) {
        self.write(|data| data.image_path = Some(path)).await
    }

    /// Fetched artifacts; `None` until the node JSON has been saved
    pub async fn snapshot(&self) -> Option<NodeSnapshot> {
        self.read(|data| {
            data.json_path.clone().map(|json_path| NodeSnapshot {
                json_path,
                image_path: data.image_path.clone(),
            })
        })
        .await
    }

    // ─── GENERATION RESULT ──────────────────────────────────────────

    pub async fn set_generation_result(&self, code: Option<String>) {
        match code {
            Some(code) => self.write(|data| data.generation_result = Some(code)).await,
            None => self.update(|data| data.generation_result = None).await,
        }
    }

    pub async fn generation_result(&self) -> Option<String> {
        self.read(|data| data.generation_result.clone()).await
    }

    // ─── FLASH MESSAGES ─────────────────────────────────────────────

    pub async fn flash(&self, category: FlashCategory, message: impl Into<String>) {
        let message = FlashMessage::new(category, message);
        self.write(|data| data.flashes.push(message)).await
    }

    /// Remove and return all queued flash messages
    pub async fn take_flashes(&self) -> Vec<FlashMessage> {
        self.update(|data| std::mem::take(&mut data.flashes)).await
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "Session layer not installed"))
    }
}

/// Session id from the request cookies, if present and well-formed
fn session_id_from_cookies(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == COOKIE_NAME)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Middleware attaching a [`Session`] to the request and issuing the cookie
pub async fn session_layer(
    State(store): State<SessionStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let existing = session_id_from_cookies(request.headers());
    let (session, created) = store.load_or_create(existing).await;
    let id = session.id();
    request.extensions_mut().insert(session);

    let mut response = next.run(request).await;
    if created {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", COOKIE_NAME, id);
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => log::error!("Failed to build session cookie: {}", e),
        }
    }
    response
}
