//! Configuration management for Gemini Relay
//!
//! Configuration is loaded from environment variables.

use anyhow::{Context, Result};
use std::env;

/// Default Gemini web front-end origin
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://gemini.google.com";
/// Default attachment upload endpoint
pub const DEFAULT_GEMINI_UPLOAD_URL: &str = "https://content-push.googleapis.com/upload";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// `__Secure-1PSID` browser cookie
    pub secure_1psid: String,
    /// `__Secure-1PSIDTS` browser cookie
    pub secure_1psidts: String,

    /// Custom bearer secret (`API_KEY`)
    pub api_key: Option<String>,
    /// Hosting platform access token (`HF_TOKEN`)
    pub hf_token: Option<String>,

    /// Gemini web front-end origin
    pub gemini_base_url: String,
    /// Attachment upload endpoint
    pub gemini_upload_url: String,

    /// Bound on each backend call, including session setup (in seconds)
    pub upstream_timeout_secs: u64,
    /// Timeout for fetching remote image references (in seconds)
    pub image_download_timeout_secs: u64,
    /// Pause between simulated stream chunks (in milliseconds)
    pub stream_chunk_delay_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("RELAY_PORT").or_else(|| lookup("PORT")) {
            Some(value) => value.parse().context("Invalid RELAY_PORT/PORT")?,
            None => 8000,
        };

        Ok(Self {
            host: lookup("RELAY_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,

            secure_1psid: lookup("SECURE_1PSID").unwrap_or_default(),
            secure_1psidts: lookup("SECURE_1PSIDTS").unwrap_or_default(),

            api_key: non_empty(lookup("API_KEY")),
            hf_token: non_empty(lookup("HF_TOKEN")),

            gemini_base_url: lookup("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            gemini_upload_url: lookup("GEMINI_UPLOAD_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_UPLOAD_URL.to_string()),

            upstream_timeout_secs: parse_or(&lookup, "UPSTREAM_TIMEOUT_SECS", 300)?,
            image_download_timeout_secs: parse_or(&lookup, "IMAGE_DOWNLOAD_TIMEOUT_SECS", 10)?,
            stream_chunk_delay_ms: parse_or(&lookup, "STREAM_CHUNK_DELAY_MS", 20)?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_or<F>(lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}
