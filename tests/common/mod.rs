//! Common test utilities for the relay
//!
//! Provides a stub chat backend, a connector that counts session builds,
//! and a harness that serves the real router through `axum-test`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderName, HeaderValue};
use axum_test::{TestRequest, TestServer};
use gemini_relay::{
    error::{AppError, AppResult},
    gemini::{Attachment, ChatBackend, Reply},
    routes, AppState, BackendConnector, Config,
};

/// Test configuration constants
pub mod constants {
    pub const TEST_API_KEY: &str = "sk-relay-test-key";
    pub const TEST_HF_TOKEN: &str = "hf_test_platform_token";
    pub const WRONG_KEY: &str = "definitely-not-the-key";
    pub const TEST_PSID: &str = "test-psid-cookie";
    pub const TEST_PSIDTS: &str = "test-psidts-cookie";
    pub const DEFAULT_REPLY: &str = "Hello! How can I help you today?";
}

/// Build a config from variable pairs, with test cookies and no stream pacing
pub fn test_config(pairs: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("SECURE_1PSID".to_string(), constants::TEST_PSID.to_string()),
        ("SECURE_1PSIDTS".to_string(), constants::TEST_PSIDTS.to_string()),
        ("STREAM_CHUNK_DELAY_MS".to_string(), "0".to_string()),
        ("UPSTREAM_TIMEOUT_SECS".to_string(), "5".to_string()),
    ]);
    for (key, value) in pairs {
        vars.insert(key.to_string(), value.to_string());
    }
    Config::from_vars(|key| vars.get(key).cloned()).expect("valid test config")
}

/// What the stub backend does when called
#[derive(Debug, Clone)]
pub enum StubBehavior {
    Reply(Reply),
    Unavailable(String),
    Hang(Duration),
}

/// One captured backend call
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

/// Chat backend returning a canned behavior and recording every call
pub struct StubBackend {
    behavior: StubBehavior,
    calls: Mutex<Vec<CapturedCall>>,
}

impl StubBackend {
    pub fn new(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<CapturedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn send(&self, prompt: &str, attachments: &[Attachment]) -> AppResult<Reply> {
        self.calls.lock().unwrap().push(CapturedCall {
            prompt: prompt.to_string(),
            attachments: attachments.to_vec(),
        });

        match &self.behavior {
            StubBehavior::Reply(reply) => Ok(reply.clone()),
            StubBehavior::Unavailable(msg) => Err(AppError::UpstreamUnavailable(msg.clone())),
            StubBehavior::Hang(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(Reply::text("too late"))
            }
        }
    }
}

/// Connector handing out one shared stub and counting session builds
pub struct StubConnector {
    pub backend: Arc<StubBackend>,
    connects: AtomicUsize,
    connect_delay: Duration,
}

impl StubConnector {
    pub fn new(backend: Arc<StubBackend>) -> Self {
        Self {
            backend,
            connects: AtomicUsize::new(0),
            connect_delay: Duration::from_millis(20),
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendConnector for StubConnector {
    async fn connect(&self) -> AppResult<Arc<dyn ChatBackend>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.connect_delay).await;
        Ok(self.backend.clone())
    }
}

/// Relay router served in-process over a stub backend
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub backend: Arc<StubBackend>,
    pub connector: Arc<StubConnector>,
}

impl TestApp {
    /// Relay with the given config pairs and backend behavior
    pub fn new(pairs: &[(&str, &str)], behavior: StubBehavior) -> Self {
        let backend = Arc::new(StubBackend::new(behavior));
        let connector = Arc::new(StubConnector::new(backend.clone()));
        let state = Arc::new(AppState::new_for_testing(
            test_config(pairs),
            connector.clone(),
        ));
        let server = TestServer::new(routes::create_router(state.clone()))
            .expect("Failed to create test server");

        Self {
            server,
            state,
            backend,
            connector,
        }
    }

    /// Open-mode relay replying with [`constants::DEFAULT_REPLY`]
    pub fn open() -> Self {
        Self::new(&[], StubBehavior::Reply(Reply::text(constants::DEFAULT_REPLY)))
    }

    /// Relay with both secrets configured, replying with [`constants::DEFAULT_REPLY`]
    pub fn secured() -> Self {
        Self::new(
            &[
                ("API_KEY", constants::TEST_API_KEY),
                ("HF_TOKEN", constants::TEST_HF_TOKEN),
            ],
            StubBehavior::Reply(Reply::text(constants::DEFAULT_REPLY)),
        )
    }
}

/// Attach `X-API-Key`
pub fn with_api_key(request: TestRequest, key: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("x-api-key"),
        HeaderValue::from_str(key).unwrap(),
    )
}

/// Attach `Authorization: Bearer`
pub fn with_bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    )
}

/// Split an SSE body into its `data:` payloads
pub fn sse_payloads(body: &str) -> Vec<String> {
    body.split("\n\n")
        .filter(|frame| !frame.trim().is_empty())
        .map(|frame| {
            frame
                .strip_prefix("data: ")
                .unwrap_or_else(|| panic!("frame without data prefix: {:?}", frame))
                .to_string()
        })
        .collect()
}

/// Sample request bodies
pub mod test_data {
    use serde_json::{json, Value};

    pub fn hello_request() -> Value {
        json!({
            "model": "gemini-2.5-flash",
            "messages": [{"role": "user", "content": "Hello"}]
        })
    }

    pub fn streaming_request() -> Value {
        json!({
            "model": "gemini-2.5-flash",
            "messages": [{"role": "user", "content": "Hello"}],
            "stream": true
        })
    }

    pub fn empty_messages_request() -> Value {
        json!({"model": "gemini-2.5-flash", "messages": []})
    }

    // 1x1 red PNG
    pub const RED_PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";

    pub fn image_request(url: &str) -> Value {
        json!({
            "model": "gemini-2.5-flash",
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is in this picture?"},
                    {"type": "image_url", "image_url": {"url": url}}
                ]
            }]
        })
    }
}
