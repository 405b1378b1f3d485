//! Multi-turn streaming text generation
//!
//! This library wraps a generative text model behind a small backend trait:
//! - **Gemini**: Google's `generativelanguage` REST API (default)
//!
//! A [`ChatSession`] keeps the ordered turn history so that a preliminary
//! "priming" turn (reference material) stays in context for the main
//! generation turn.
//!
//! # Example
//!
//! ```rust,ignore
//! use generation::{ChatSession, GeminiBackend, GenerationConfig};
//! use std::sync::Arc;
//!
//! let backend = GeminiBackend::new(GenerationConfig::default(), api_key);
//! let mut chat = ChatSession::new(Arc::new(backend));
//!
//! let ack = chat.send_message("Remember this context...").await?;
//! let mut stream = chat.send_message_stream("Now generate...").await?;
//! ```

pub mod backend;
pub mod chat;
pub mod config;
pub mod types;

// Re-exports for convenience
pub use backend::gemini::GeminiBackend;
pub use backend::{
    classify_error_text, BackendError, BackendFactory, ChunkStream, ErrorKind, GeminiFactory,
    GenerationBackend, GenerationChunk, Reply, SharedBackend,
};
pub use chat::ChatSession;
pub use config::{ContextStrategy, GenerationConfig};
pub use types::{Role, Turn};
