//! Chat completions endpoint
//!
//! OpenAI-compatible chat completions backed by the Gemini web session.
//! Handles both plain JSON responses and simulated SSE streams.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, info, warn};

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthPath,
    routes::metrics::{record_request, record_tokens},
    streaming::simulated_stream,
    translate::{
        build_response, prepare_chat, render_reply, ChatCompletionRequest, CompletionMeta, Usage,
    },
    AppState,
};

/// Upper bound on request bodies, sized for inline base64 images
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Reply ready to be returned in either mode
struct Completion {
    meta: CompletionMeta,
    content: String,
    usage: Usage,
}

/// Handle chat completion requests
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let auth_path = request
        .extensions()
        .get::<AuthPath>()
        .map(AuthPath::label)
        .unwrap_or_else(|| "unknown".to_string());

    let body = axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let chat_request: ChatCompletionRequest = serde_json::from_slice(&body)?;

    info!(
        model = %chat_request.model,
        stream = chat_request.stream,
        messages = chat_request.messages.len(),
        auth = %auth_path,
        "Processing chat completion request"
    );

    let completion = match complete(&state, &chat_request).await {
        Ok(completion) => completion,
        Err(e) => {
            record_request(e.kind(), &chat_request.model, start_time.elapsed().as_secs_f64());
            if e.is_upstream() {
                error!(kind = e.kind(), error = %e, "Chat completion failed upstream");
            } else {
                warn!(kind = e.kind(), error = %e, "Chat completion rejected");
            }
            return Err(e);
        }
    };

    record_tokens("prompt", completion.usage.prompt_tokens as u64);
    record_tokens("completion", completion.usage.completion_tokens as u64);

    let duration = start_time.elapsed().as_secs_f64();
    record_request("success", &chat_request.model, duration);
    info!(
        model = %completion.meta.model,
        duration_ms = %format!("{:.2}", duration * 1000.0),
        completion_tokens = completion.usage.completion_tokens,
        "Chat completion request completed"
    );

    if chat_request.stream {
        streaming_response(&state, completion)
    } else {
        let response = build_response(&completion.meta, completion.content, completion.usage);
        Ok((StatusCode::OK, Json(response)).into_response())
    }
}

/// Run the request through translation and the session gateway
async fn complete(state: &AppState, request: &ChatCompletionRequest) -> AppResult<Completion> {
    let prepared = prepare_chat(request, &state.attachments).await?;

    let reply = state
        .gateway
        .send(&prepared.prompt, &prepared.attachments)
        .await?;
    if reply.is_empty() {
        return Err(AppError::UpstreamUnavailable(
            "Gemini returned an empty reply".to_string(),
        ));
    }

    let content = render_reply(&reply);
    let usage = state.token_counter.usage(&prepared.prompt, &content);

    Ok(Completion {
        meta: CompletionMeta::new(request.model.clone()),
        content,
        usage,
    })
}

/// Re-chunk a complete reply into an SSE response
fn streaming_response(state: &AppState, completion: Completion) -> Result<Response, AppError> {
    let stream = simulated_stream(
        completion.meta,
        completion.content,
        state.stream_chunk_delay(),
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(Body::from_stream(stream))
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build response: {}", e)))
}
