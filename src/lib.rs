//! Gemini Relay - OpenAI-compatible front for the Gemini web client
//!
//! This library provides the core functionality for the relay server. It
//! authenticates callers, translates OpenAI chat requests into Gemini web
//! prompts, and returns replies as chat completions or simulated SSE
//! streams.

pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod gemini;
pub mod middleware;
pub mod routes;
pub mod streaming;
pub mod tokens;
pub mod translate;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

pub use crate::config::Config;
pub use crate::credentials::{AuthMode, CredentialStore};
pub use crate::gateway::{BackendConnector, SessionGateway};
pub use crate::gemini::{ChatBackend, GeminiConnector};
pub use crate::tokens::SharedTokenCounter;
pub use crate::translate::AttachmentResolver;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub credentials: Arc<CredentialStore>,
    /// Lazily-initialized Gemini session
    pub gateway: Arc<SessionGateway>,
    pub attachments: AttachmentResolver,
    pub start_time: Instant,
    /// Token counter for usage estimates
    pub token_counter: SharedTokenCounter,
}

impl AppState {
    /// Create a new application state
    ///
    /// No backend call is made here; the Gemini session is built on the
    /// first chat request.
    pub fn new(config: Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(16)
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        let credentials = Arc::new(CredentialStore::from_config(&config));
        let connector: Arc<dyn BackendConnector> = Arc::new(GeminiConnector::new(
            http_client.clone(),
            &config,
            credentials.clone(),
        ));

        Ok(Self::assemble(config, credentials, connector, http_client))
    }

    /// Create an application state around a substitute backend connector
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(config: Config, connector: Arc<dyn BackendConnector>) -> Self {
        let credentials = Arc::new(CredentialStore::from_config(&config));
        Self::assemble(config, credentials, connector, reqwest::Client::new())
    }

    fn assemble(
        config: Config,
        credentials: Arc<CredentialStore>,
        connector: Arc<dyn BackendConnector>,
        http_client: reqwest::Client,
    ) -> Self {
        let gateway = Arc::new(SessionGateway::new(
            connector,
            Duration::from_secs(config.upstream_timeout_secs),
        ));
        let attachments = AttachmentResolver::new(
            http_client,
            Duration::from_secs(config.image_download_timeout_secs),
        );

        Self {
            config,
            credentials,
            gateway,
            attachments,
            start_time: Instant::now(),
            token_counter: SharedTokenCounter::new(),
        }
    }

    pub fn stream_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.config.stream_chunk_delay_ms)
    }
}
