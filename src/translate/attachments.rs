//! Image attachment resolution
//!
//! Turns image references from structured message parts into in-memory
//! attachments: `data:image/...;base64,` URLs are decoded, `http(s)` URLs
//! are downloaded. Anything else, or any failure, is an attachment error.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument, warn};

use crate::{
    error::{AppError, AppResult},
    gemini::Attachment,
};

/// File extension for an image MIME type
pub fn extension_for_mime(mime: &str) -> &'static str {
    let mime = mime.to_ascii_lowercase();
    if mime.contains("jpeg") || mime.contains("jpg") {
        "jpg"
    } else if mime.contains("png") {
        "png"
    } else if mime.contains("gif") {
        "gif"
    } else if mime.contains("webp") {
        "webp"
    } else {
        "png"
    }
}

fn attachment_name(index: usize, mime: &str) -> String {
    format!("image-{}.{}", index + 1, extension_for_mime(mime))
}

/// Decode a `data:image/<type>;base64,<payload>` URL
pub fn decode_data_url(url: &str, index: usize) -> AppResult<Attachment> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| AppError::AttachmentDecode("data URL has no payload".to_string()))?;

    let mut params = header.trim_start_matches("data:").split(';');
    let mime = params.next().unwrap_or_default().trim().to_string();
    if !mime.starts_with("image/") {
        return Err(AppError::AttachmentDecode(format!(
            "data URL is not an image (got '{}')",
            mime
        )));
    }
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(AppError::AttachmentDecode(
            "only base64-encoded data URLs are supported".to_string(),
        ));
    }

    let data = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::AttachmentDecode(format!("invalid base64 image data: {}", e)))?;
    if data.is_empty() {
        return Err(AppError::AttachmentDecode("image data is empty".to_string()));
    }

    Ok(Attachment {
        filename: attachment_name(index, &mime),
        mime_type: mime,
        data: Bytes::from(data),
    })
}

/// Resolves image references into attachments
#[derive(Clone)]
pub struct AttachmentResolver {
    client: reqwest::Client,
    download_timeout: Duration,
}

impl AttachmentResolver {
    pub fn new(client: reqwest::Client, download_timeout: Duration) -> Self {
        Self {
            client,
            download_timeout,
        }
    }

    /// Resolve every reference in order, failing on the first bad one
    #[instrument(skip_all, fields(count = refs.len()))]
    pub async fn resolve(&self, refs: &[String]) -> AppResult<Vec<Attachment>> {
        let mut attachments = Vec::with_capacity(refs.len());
        for (index, url) in refs.iter().enumerate() {
            let attachment = self.resolve_one(url, index).await.map_err(|e| {
                warn!(index, error = %e, "Image attachment could not be resolved");
                e
            })?;
            debug!(
                index,
                filename = %attachment.filename,
                size = attachment.data.len(),
                "Image attachment resolved"
            );
            attachments.push(attachment);
        }
        Ok(attachments)
    }

    async fn resolve_one(&self, url: &str, index: usize) -> AppResult<Attachment> {
        if url.starts_with("data:") {
            decode_data_url(url, index)
        } else if url.starts_with("http://") || url.starts_with("https://") {
            self.download(url, index).await
        } else {
            Err(AppError::AttachmentDecode(format!(
                "unsupported image reference for image {}; use a data URL or an http(s) URL",
                index + 1
            )))
        }
    }

    async fn download(&self, url: &str, index: usize) -> AppResult<Attachment> {
        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| {
                AppError::AttachmentDecode(format!("failed to download image {}: {}", index + 1, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::AttachmentDecode(format!(
                "failed to download image {}: HTTP {}",
                index + 1,
                status
            )));
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| "image/png".to_string());

        let data = response.bytes().await.map_err(|e| {
            AppError::AttachmentDecode(format!("failed to read image {}: {}", index + 1, e))
        })?;
        if data.is_empty() {
            return Err(AppError::AttachmentDecode(format!(
                "image {} is empty",
                index + 1
            )));
        }

        Ok(Attachment {
            filename: attachment_name(index, &mime),
            mime_type: mime,
            data,
        })
    }
}
