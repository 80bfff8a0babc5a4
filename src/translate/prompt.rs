//! Prompt flattening
//!
//! Collapses an ordered list of chat messages into the single prompt string
//! the Gemini web client accepts. Image parts are collected separately and
//! referenced in the prompt by position.

use crate::{
    error::{AppError, AppResult},
    translate::types::{ChatMessage, ContentPart, MessageContent},
};

/// Cue appended after the conversation so the model answers as the assistant
pub const ASSISTANT_CUE: &str = "Assistant: ";

/// Result of flattening a conversation
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedPrompt {
    pub prompt: String,
    /// Image references in order of appearance
    pub image_refs: Vec<String>,
}

/// Flatten messages into one prompt
///
/// Fails with a validation error when there are no messages, or when no
/// message carries any text or image.
pub fn flatten_messages(messages: &[ChatMessage]) -> AppResult<FlattenedPrompt> {
    if messages.is_empty() {
        return Err(AppError::BadRequest(
            "messages must contain at least one message".to_string(),
        ));
    }

    let mut prompt = String::new();
    let mut image_refs = Vec::new();
    let mut has_text = false;

    for message in messages {
        prompt.push_str(message.role.prompt_label());
        prompt.push_str(": ");

        match &message.content {
            MessageContent::Text(text) => {
                has_text |= !text.trim().is_empty();
                prompt.push_str(text);
            }
            MessageContent::Parts(parts) => {
                for part in parts {
                    match part {
                        ContentPart::Text { text } => {
                            has_text |= !text.trim().is_empty();
                            prompt.push_str(text);
                        }
                        ContentPart::ImageUrl { image_url } => {
                            image_refs.push(image_url.url.clone());
                            prompt.push_str(&format!("[Image {}] ", image_refs.len()));
                        }
                    }
                }
            }
        }

        prompt.push_str("\n\n");
    }

    if !has_text && image_refs.is_empty() {
        return Err(AppError::BadRequest(
            "prompt is empty: no message contains text or images".to_string(),
        ));
    }

    prompt.push_str(ASSISTANT_CUE);

    Ok(FlattenedPrompt { prompt, image_refs })
}
