//! Gemini web client
//!
//! HTTP client that drives the Gemini web front-end with browser cookies.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, COOKIE, ORIGIN, REFERER, USER_AGENT};
use reqwest::multipart::{Form, Part};
use tracing::{debug, error, info, instrument};

use crate::{
    config::Config,
    credentials::CredentialStore,
    error::{AppError, AppResult},
    gateway::BackendConnector,
    gemini::{
        models::{build_request_payload, parse_generate_response, SessionTokens},
        Attachment, ChatBackend, Reply,
    },
};

const GENERATE_PATH: &str =
    "/_/BardChatUi/data/assistant.lamda.BardFrontendService/StreamGenerate";
const UPLOAD_PUSH_ID: &str = "feeds/mcudyrk2a4khkz";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Authenticated Gemini web session
pub struct GeminiWebClient {
    client: reqwest::Client,
    base_url: String,
    upload_url: String,
    cookie_header: String,
    tokens: SessionTokens,
    reqid: AtomicU64,
}

impl GeminiWebClient {
    /// Establish a session by loading the app page with the stored cookies
    #[instrument(skip_all, fields(base_url = %base_url))]
    pub async fn init(
        client: reqwest::Client,
        base_url: &str,
        upload_url: &str,
        credentials: &CredentialStore,
    ) -> AppResult<Self> {
        let cookie_header = cookie_header(credentials);
        let url = format!("{}/app", base_url);

        debug!(url = %url, "Loading Gemini app page");

        let response = client
            .get(&url)
            .headers(browser_headers(&cookie_header, base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Gemini app page request failed");
            return Err(AppError::UpstreamUnavailable(format!(
                "Gemini app page returned {}",
                status
            )));
        }

        let html = response.text().await?;
        let tokens = SessionTokens::from_app_page(&html)?;

        info!(
            has_build_label = tokens.build_label.is_some(),
            has_session_id = tokens.session_id.is_some(),
            "Gemini session established"
        );

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            upload_url: upload_url.to_string(),
            cookie_header,
            tokens,
            reqid: AtomicU64::new(10_000),
        })
    }

    /// Upload one attachment and return its upload id
    #[instrument(skip_all, fields(filename = %attachment.filename, size = attachment.data.len()))]
    async fn upload(&self, attachment: &Attachment) -> AppResult<String> {
        let part = Part::bytes(attachment.data.to_vec())
            .file_name(attachment.filename.clone())
            .mime_str(&attachment.mime_type)
            .map_err(|e| AppError::AttachmentDecode(format!("Invalid MIME type: {}", e)))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&self.upload_url)
            .header("Push-ID", UPLOAD_PUSH_ID)
            .header(COOKIE, &self.cookie_header)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, "Gemini attachment upload failed");
            return Err(AppError::UpstreamUnavailable(format!(
                "Attachment upload returned {}",
                status
            )));
        }

        let upload_id = response.text().await?.trim().to_string();
        debug!(upload_id = %upload_id, "Attachment uploaded");
        Ok(upload_id)
    }

    /// Run one generate round trip
    #[instrument(skip_all, fields(prompt_len = prompt.len(), attachments = attachments.len()))]
    pub async fn generate(&self, prompt: &str, attachments: &[Attachment]) -> AppResult<Reply> {
        let mut files = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let id = self.upload(attachment).await?;
            files.push((id, attachment.filename.clone()));
        }

        let reqid = self.reqid.fetch_add(100_000, Ordering::Relaxed);
        let mut query = vec![("_reqid", reqid.to_string()), ("rt", "c".to_string())];
        if let Some(bl) = &self.tokens.build_label {
            query.push(("bl", bl.clone()));
        }
        if let Some(sid) = &self.tokens.session_id {
            query.push(("f.sid", sid.clone()));
        }

        let payload = build_request_payload(prompt, &files);
        let url = format!("{}{}", self.base_url, GENERATE_PATH);

        debug!(url = %url, "Sending prompt to Gemini");

        let response = self
            .client
            .post(&url)
            .headers(browser_headers(&self.cookie_header, &self.base_url))
            .query(&query)
            .form(&[
                ("at", self.tokens.access_token.as_str()),
                ("f.req", payload.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, body = %text, "Gemini generate request failed");
            return Err(AppError::UpstreamUnavailable(format!(
                "Gemini returned {}",
                status
            )));
        }

        let body = response.text().await?;
        let reply = parse_generate_response(&body)?;

        debug!(
            text_len = reply.text.len(),
            images = reply.images.len(),
            has_thoughts = reply.thoughts.is_some(),
            "Gemini reply received"
        );
        Ok(reply)
    }
}

#[async_trait]
impl ChatBackend for GeminiWebClient {
    fn name(&self) -> &'static str {
        "gemini-web"
    }

    async fn send(&self, prompt: &str, attachments: &[Attachment]) -> AppResult<Reply> {
        self.generate(prompt, attachments).await
    }
}

/// Builds [`GeminiWebClient`] sessions from the stored cookies
pub struct GeminiConnector {
    client: reqwest::Client,
    base_url: String,
    upload_url: String,
    credentials: Arc<CredentialStore>,
}

impl GeminiConnector {
    pub fn new(client: reqwest::Client, config: &Config, credentials: Arc<CredentialStore>) -> Self {
        Self {
            client,
            base_url: config.gemini_base_url.clone(),
            upload_url: config.gemini_upload_url.clone(),
            credentials,
        }
    }
}

#[async_trait]
impl BackendConnector for GeminiConnector {
    async fn connect(&self) -> AppResult<Arc<dyn ChatBackend>> {
        if !self.credentials.has_session_cookies() {
            return Err(AppError::UpstreamUnavailable(
                "SECURE_1PSID / SECURE_1PSIDTS session cookies are not configured".to_string(),
            ));
        }

        let client = GeminiWebClient::init(
            self.client.clone(),
            &self.base_url,
            &self.upload_url,
            &self.credentials,
        )
        .await?;
        Ok(Arc::new(client))
    }
}

fn cookie_header(credentials: &CredentialStore) -> String {
    [
        ("__Secure-1PSID", &credentials.cookie_primary),
        ("__Secure-1PSIDTS", &credentials.cookie_secondary),
    ]
    .iter()
    .filter(|(_, value)| !value.is_empty())
    .map(|(name, value)| format!("{}={}", name, value.expose()))
    .collect::<Vec<_>>()
    .join("; ")
}

fn browser_headers(cookie_header: &str, base_url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded;charset=utf-8"),
    );
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert("X-Same-Domain", HeaderValue::from_static("1"));
    if let Ok(origin) = HeaderValue::from_str(base_url) {
        headers.insert(ORIGIN, origin.clone());
        headers.insert(REFERER, origin);
    }
    if let Ok(cookie) = HeaderValue::from_str(cookie_header) {
        headers.insert(COOKIE, cookie);
    }
    headers
}
