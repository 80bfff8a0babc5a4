//! Simulated SSE streaming
//!
//! The Gemini web backend only returns complete replies, so streamed
//! responses are produced by re-chunking the finished text into word-sized
//! deltas paced by a short delay. Chunk timing says nothing about generation
//! progress.

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;

use crate::translate::{ChatCompletionChunk, ChunkChoice, CompletionMeta, Delta, Role};

/// Split text into deltas, each a word plus its trailing whitespace
///
/// Concatenating the pieces yields the input exactly.
pub fn split_into_deltas(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_whitespace = false;

    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            in_whitespace = true;
        } else if in_whitespace {
            pieces.push(&text[start..i]);
            start = i;
            in_whitespace = false;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

/// Create a chunk carrying the stream's shared identity
pub fn create_chunk(
    meta: &CompletionMeta,
    delta: Delta,
    finish_reason: Option<&str>,
) -> ChatCompletionChunk {
    ChatCompletionChunk {
        id: meta.id.clone(),
        object: "chat.completion.chunk".to_string(),
        created: meta.created,
        model: meta.model.clone(),
        choices: vec![ChunkChoice {
            index: 0,
            delta,
            finish_reason: finish_reason.map(str::to_string),
        }],
    }
}

/// Format a chunk as an SSE data event: `data: {json}\n\n`
pub fn format_sse_chunk(chunk: &ChatCompletionChunk) -> Bytes {
    let json = serde_json::to_string(chunk).expect("ChatCompletionChunk should always serialize");
    Bytes::from(format!("data: {}\n\n", json))
}

/// Format the stream terminator: `data: [DONE]\n\n`
pub fn format_sse_done() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

/// Every frame of a simulated stream, in order
pub fn stream_frames(meta: &CompletionMeta, text: &str) -> Vec<Bytes> {
    let deltas = split_into_deltas(text);
    let mut frames = Vec::with_capacity(deltas.len() + 3);

    frames.push(format_sse_chunk(&create_chunk(
        meta,
        Delta {
            role: Some(Role::Assistant),
            content: None,
        },
        None,
    )));
    frames.extend(deltas.into_iter().map(|piece| {
        format_sse_chunk(&create_chunk(
            meta,
            Delta {
                role: None,
                content: Some(piece.to_string()),
            },
            None,
        ))
    }));
    frames.push(format_sse_chunk(&create_chunk(meta, Delta::default(), Some("stop"))));
    frames.push(format_sse_done());

    frames
}

/// Paced stream of SSE frames for a complete reply
///
/// Pauses `delay` after each content chunk. Emission stops as soon as the
/// consumer drops the stream, e.g. when the client disconnects.
pub fn simulated_stream(
    meta: CompletionMeta,
    text: String,
    delay: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        let frames = stream_frames(&meta, &text);
        let last_content = frames.len().saturating_sub(2);

        for (i, frame) in frames.into_iter().enumerate() {
            yield Ok(frame);
            if i > 0 && i < last_content && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
