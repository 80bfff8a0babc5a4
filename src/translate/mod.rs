//! Request translation
//!
//! Converts OpenAI-shaped chat requests into a single Gemini prompt plus
//! attachments, and Gemini replies back into OpenAI-shaped responses.

pub mod attachments;
pub mod prompt;
pub mod reply;
pub mod types;

use chrono::Utc;
use uuid::Uuid;

use crate::{error::AppResult, gemini::Attachment};

pub use attachments::AttachmentResolver;
pub use prompt::{flatten_messages, FlattenedPrompt};
pub use reply::render_reply;
pub use types::{
    AssistantMessage, ChatCompletionChoice, ChatCompletionChunk, ChatCompletionRequest,
    ChatCompletionResponse, ChatMessage, ChunkChoice, ContentPart, Delta, MessageContent, Role,
    Usage,
};

/// Prompt and attachments ready for the session gateway
#[derive(Debug, Clone)]
pub struct PreparedChat {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

/// Validate and flatten a request, resolving its image references
///
/// No backend call happens here; a request that fails validation never
/// reaches the gateway.
pub async fn prepare_chat(
    request: &ChatCompletionRequest,
    resolver: &AttachmentResolver,
) -> AppResult<PreparedChat> {
    let FlattenedPrompt { prompt, image_refs } = flatten_messages(&request.messages)?;
    let attachments = resolver.resolve(&image_refs).await?;
    Ok(PreparedChat {
        prompt,
        attachments,
    })
}

/// Identity shared by a response or by every chunk of a stream
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionMeta {
    pub id: String,
    pub created: i64,
    pub model: String,
}

impl CompletionMeta {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4()),
            created: Utc::now().timestamp(),
            model: model.into(),
        }
    }
}

/// Wrap assistant content into a complete chat completion
pub fn build_response(meta: &CompletionMeta, content: String, usage: Usage) -> ChatCompletionResponse {
    ChatCompletionResponse {
        id: meta.id.clone(),
        object: "chat.completion".to_string(),
        created: meta.created,
        model: meta.model.clone(),
        choices: vec![ChatCompletionChoice {
            index: 0,
            message: AssistantMessage {
                role: Role::Assistant,
                content,
            },
            finish_reason: "stop".to_string(),
        }],
        usage,
    }
}
