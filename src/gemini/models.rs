//! Gemini web payloads
//!
//! The StreamGenerate endpoint answers with a `)]}'`-guarded, length-prefixed
//! list of JSON envelopes. Positional indexes below follow the layout the web
//! front-end uses.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, AppResult};

static ACCESS_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""SNlM0e":"(.*?)""#).expect("valid regex"));
static BUILD_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""cfb2h":"(.*?)""#).expect("valid regex"));
static SESSION_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""FdrFJe":"(.*?)""#).expect("valid regex"));

/// Placeholder link Gemini inserts for rich cards
const CARD_CONTENT_PREFIX: &str = "http://googleusercontent.com/card_content/";

/// Tokens scraped from the Gemini app page
#[derive(Debug, Clone, PartialEq)]
pub struct SessionTokens {
    pub access_token: String,
    pub build_label: Option<String>,
    pub session_id: Option<String>,
}

impl SessionTokens {
    /// Extract session tokens from the `/app` HTML page
    ///
    /// The access token is only embedded for a logged-in session, so a
    /// missing token means the cookies were rejected.
    pub fn from_app_page(html: &str) -> AppResult<Self> {
        let capture = |re: &Regex| {
            re.captures(html)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .filter(|s| !s.is_empty())
        };

        let access_token = capture(&ACCESS_TOKEN_RE).ok_or_else(|| {
            AppError::UpstreamUnavailable(
                "Gemini session could not be established; SECURE_1PSID / SECURE_1PSIDTS cookies are expired or invalid"
                    .to_string(),
            )
        })?;

        Ok(Self {
            access_token,
            build_label: capture(&BUILD_LABEL_RE),
            session_id: capture(&SESSION_ID_RE),
        })
    }
}

/// Image attached to a reply
#[derive(Debug, Clone, PartialEq)]
pub struct ReplyImage {
    pub url: String,
    pub title: Option<String>,
    pub alt: Option<String>,
    /// Produced by the model rather than found on the web
    pub generated: bool,
}

/// Complete backend reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub text: String,
    pub thoughts: Option<String>,
    pub images: Vec<ReplyImage>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.images.is_empty()
    }
}

/// Build the `f.req` form field for a generate call
///
/// `files` holds `(upload_id, filename)` pairs from prior uploads.
pub fn build_request_payload(prompt: &str, files: &[(String, String)]) -> String {
    let files_value = if files.is_empty() {
        Value::Null
    } else {
        Value::Array(
            files
                .iter()
                .map(|(id, name)| serde_json::json!([[id], name]))
                .collect(),
        )
    };

    let inner = serde_json::json!([[prompt, 0, null, files_value], null, null]);
    serde_json::json!([null, inner.to_string()]).to_string()
}

/// Parse a StreamGenerate response body into a [`Reply`]
pub fn parse_generate_response(raw: &str) -> AppResult<Reply> {
    let body = raw.trim_start().trim_start_matches(")]}'");

    let candidate = body
        .lines()
        .filter_map(|line| serde_json::from_str::<Value>(line.trim()).ok())
        .filter_map(|value| match value {
            Value::Array(parts) => Some(parts),
            _ => None,
        })
        .flatten()
        .find_map(|part| {
            let inner = part.get(2)?.as_str()?;
            let main: Value = serde_json::from_str(inner).ok()?;
            main.get(4)?.as_array()?.first().cloned()
        })
        .ok_or_else(|| {
            AppError::UpstreamUnavailable(
                "Gemini returned no reply candidates; the session may be expired or rate limited"
                    .to_string(),
            )
        })?;

    let mut text = candidate
        .pointer("/1/0")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if text.starts_with(CARD_CONTENT_PREFIX) {
        text = candidate
            .pointer("/22/0")
            .and_then(Value::as_str)
            .unwrap_or(&text)
            .to_string();
    }

    let thoughts = candidate
        .pointer("/37/0/0")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let mut images = Vec::new();

    if let Some(web_images) = candidate.pointer("/12/1").and_then(Value::as_array) {
        images.extend(web_images.iter().filter_map(|image| {
            Some(ReplyImage {
                url: image.pointer("/0/0/0")?.as_str()?.to_string(),
                title: image.pointer("/7/0").and_then(Value::as_str).map(str::to_string),
                alt: image.pointer("/0/4").and_then(Value::as_str).map(str::to_string),
                generated: false,
            })
        }));
    }

    if let Some(generated) = candidate.pointer("/12/7/0").and_then(Value::as_array) {
        images.extend(generated.iter().enumerate().filter_map(|(i, image)| {
            Some(ReplyImage {
                url: image.pointer("/0/3/3")?.as_str()?.to_string(),
                title: Some(format!("Generated Image {}", i + 1)),
                alt: image
                    .pointer("/3/5/0")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                generated: true,
            })
        }));
    }

    Ok(Reply {
        text,
        thoughts,
        images,
    })
}
