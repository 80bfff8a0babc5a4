//! Models endpoint
//!
//! The web client exposes no model catalogue, so a fixed list is returned.
//! The `model` field of a chat request is not used for routing.

use axum::{http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Model ids advertised by `GET /v1/models`
pub const MODEL_IDS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-2.5-pro",
    "gemini-2.0-flash",
    "gemini-2.0-flash-thinking",
];

pub const MODEL_OWNER: &str = "google-gemini-web";

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

/// Models list response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<Model>,
}

pub fn available_models() -> ModelsResponse {
    let created = Utc::now().timestamp();
    ModelsResponse {
        object: "list".to_string(),
        data: MODEL_IDS
            .iter()
            .map(|id| Model {
                id: id.to_string(),
                object: "model".to_string(),
                created,
                owned_by: MODEL_OWNER.to_string(),
            })
            .collect(),
    }
}

/// List available models
pub async fn list_models() -> (StatusCode, Json<ModelsResponse>) {
    (StatusCode::OK, Json(available_models()))
}
