//! Gemini web backend
//!
//! Client for the Gemini web front-end, authenticated with browser session
//! cookies. The rest of the relay only sees the [`ChatBackend`] trait.

pub mod client;
pub mod models;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::AppResult;

pub use client::{GeminiConnector, GeminiWebClient};
pub use models::{Reply, ReplyImage};

/// Image file submitted alongside a prompt
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// Prompt-in, reply-out conversational backend
///
/// Every call is an independent turn; no conversation state is carried
/// between calls.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Submit a prompt with optional attachments and wait for the full reply
    async fn send(&self, prompt: &str, attachments: &[Attachment]) -> AppResult<Reply>;
}
