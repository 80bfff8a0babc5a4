//! Root status endpoint
//!
//! `GET /` reports liveness, auth mode and whether the Gemini session has
//! been built. It never triggers session initialization.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{credentials::AuthMode, AppState};

/// Status payload for `GET /`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootStatus {
    pub status: String,
    pub message: String,
    pub version: String,
    pub auth_mode: AuthMode,
    pub session_initialized: bool,
    pub uptime_seconds: u64,
}

pub async fn root_status(State(state): State<Arc<AppState>>) -> Json<RootStatus> {
    Json(RootStatus {
        status: "online".to_string(),
        message: "Gemini relay is running. Use /v1/chat/completions with an OpenAI client."
            .to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_mode: state.credentials.auth_mode(),
        session_initialized: state.gateway.is_initialized(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}
