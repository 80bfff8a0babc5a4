//! Session gateway
//!
//! Owns the single Gemini session handle for the process. The handle is
//! built lazily on first use, under a lock, so concurrent first requests
//! never construct two sessions. A call that fails upstream drops the cached
//! handle; the next request builds a fresh session from the same cookies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{error, field, info, instrument, warn, Span};

use crate::{
    error::{AppError, AppResult},
    gemini::{Attachment, ChatBackend, Reply},
    routes::metrics::record_upstream_error,
};

/// Factory for backend sessions
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(&self) -> AppResult<Arc<dyn ChatBackend>>;
}

pub struct SessionGateway {
    connector: Arc<dyn BackendConnector>,
    slot: Mutex<Option<Arc<dyn ChatBackend>>>,
    timeout: Duration,
}

impl SessionGateway {
    pub fn new(connector: Arc<dyn BackendConnector>, timeout: Duration) -> Self {
        Self {
            connector,
            slot: Mutex::new(None),
            timeout,
        }
    }

    /// Get the session handle, connecting on first use
    pub async fn client(&self) -> AppResult<Arc<dyn ChatBackend>> {
        let mut slot = self.slot.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        info!("Initializing Gemini session");
        let client = self.connector.connect().await.map_err(|e| {
            error!(kind = e.kind(), error = %e, "Failed to initialize Gemini session");
            e
        })?;
        *slot = Some(client.clone());
        Ok(client)
    }

    /// Whether a session is cached; reports false while one is being built
    pub fn is_initialized(&self) -> bool {
        self.slot.try_lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    /// Drop the cached handle so the next call reconnects
    ///
    /// Only clears the slot while it still holds `failed`; a session rebuilt
    /// in the meantime is kept.
    pub async fn invalidate(&self, failed: &Arc<dyn ChatBackend>) {
        let mut slot = self.slot.lock().await;
        if slot.as_ref().is_some_and(|current| Arc::ptr_eq(current, failed)) {
            *slot = None;
            warn!("Gemini session invalidated; it will be rebuilt on the next request");
        }
    }

    /// Submit a prompt and wait for the reply, bounded by the upstream timeout
    ///
    /// Failures are returned as-is and never retried.
    #[instrument(
        skip_all,
        fields(prompt_len = prompt.len(), attachments = attachments.len(), backend = field::Empty)
    )]
    pub async fn send(&self, prompt: &str, attachments: &[Attachment]) -> AppResult<Reply> {
        let mut used: Option<Arc<dyn ChatBackend>> = None;
        let call = async {
            let client = self.client().await?;
            Span::current().record("backend", client.name());
            used = Some(client.clone());
            client.send(prompt, attachments).await
        };

        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::UpstreamTimeout(self.timeout.as_secs())),
        };

        if let Err(e) = &result {
            record_upstream_error(e.kind());
            match e {
                AppError::UpstreamUnavailable(_) => {
                    error!(kind = e.kind(), error = %e, "Gemini backend call failed");
                    if let Some(client) = &used {
                        self.invalidate(client).await;
                    }
                }
                AppError::UpstreamTimeout(_) => {
                    error!(kind = e.kind(), error = %e, "Gemini backend call timed out");
                }
                _ => {
                    warn!(kind = e.kind(), error = %e, "Gemini backend call rejected");
                }
            }
        }

        result
    }
}
