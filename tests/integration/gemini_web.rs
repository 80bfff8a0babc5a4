//! Full-path tests against a mocked Gemini web front-end
//!
//! These run the real web client, connector and session gateway; only the
//! Gemini servers are replaced by wiremock.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};

use crate::common::{test_config, test_data};
use crate::mocks::gemini::{MockGeminiWeb, ACCESS_TOKEN, GENERATE_PATH};
use gemini_relay::{routes, AppState};

fn relay_for(mock: &MockGeminiWeb, extra: &[(&str, &str)]) -> TestServer {
    let base_url = mock.uri();
    let upload_url = mock.upload_url();
    let mut pairs = vec![
        ("GEMINI_BASE_URL", base_url.as_str()),
        ("GEMINI_UPLOAD_URL", upload_url.as_str()),
    ];
    pairs.extend_from_slice(extra);

    let state = Arc::new(AppState::new(test_config(&pairs)).expect("state"));
    TestServer::new(routes::create_router(state)).expect("Failed to create test server")
}

/// Decode one field of a urlencoded form body
fn form_field(body: &[u8], name: &str) -> Option<String> {
    let query = std::str::from_utf8(body).ok()?;
    let url = reqwest::Url::parse(&format!("http://form.local/?{}", query)).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn test_text_reply_through_web_client() {
    let mock = MockGeminiWeb::start().await;
    mock.mock_app_page().await;
    mock.mock_generate_text("Hello from the web client!").await;
    let server = relay_for(&mock, &[]);

    let response = server
        .post("/v1/chat/completions")
        .json(&test_data::hello_request())
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(
        body["choices"][0]["message"]["content"],
        "Hello from the web client!"
    );

    let generate = mock.requests_to(GENERATE_PATH).await;
    assert_eq!(generate.len(), 1);
    assert_eq!(form_field(&generate[0].body, "at").as_deref(), Some(ACCESS_TOKEN));

    let f_req: Value = serde_json::from_str(&form_field(&generate[0].body, "f.req").unwrap()).unwrap();
    let inner: Value = serde_json::from_str(f_req[1].as_str().unwrap()).unwrap();
    assert_eq!(inner[0][0], "Human: Hello\n\nAssistant: ");

    let cookie = generate[0].headers.get("cookie").unwrap().to_str().unwrap();
    assert!(cookie.contains("__Secure-1PSID=test-psid-cookie"));
    assert!(cookie.contains("__Secure-1PSIDTS=test-psidts-cookie"));
}

#[tokio::test]
async fn test_session_reused_across_requests() {
    let mock = MockGeminiWeb::start().await;
    mock.mock_app_page().await;
    mock.mock_generate_text("Again").await;
    let server = relay_for(&mock, &[]);

    for _ in 0..3 {
        server
            .post("/v1/chat/completions")
            .json(&test_data::hello_request())
            .await
            .assert_status_ok();
    }

    assert_eq!(mock.requests_to("/app").await.len(), 1);
    assert_eq!(mock.requests_to(GENERATE_PATH).await.len(), 3);
}

#[tokio::test]
async fn test_expired_cookies_surface_as_bad_gateway() {
    let mock = MockGeminiWeb::start().await;
    mock.mock_app_page_signed_out().await;
    let server = relay_for(&mock, &[]);

    let response = server
        .post("/v1/chat/completions")
        .json(&test_data::hello_request())
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "upstream_unavailable");
    assert!(mock.requests_to(GENERATE_PATH).await.is_empty());
}

#[tokio::test]
async fn test_generate_failure_rebuilds_session_next_time() {
    let mock = MockGeminiWeb::start().await;
    mock.mock_app_page().await;
    mock.mock_generate_status(429).await;
    let server = relay_for(&mock, &[]);

    for _ in 0..2 {
        server
            .post("/v1/chat/completions")
            .json(&test_data::hello_request())
            .await
            .assert_status(StatusCode::BAD_GATEWAY);
    }

    assert_eq!(mock.requests_to("/app").await.len(), 2);
    assert_eq!(mock.requests_to(GENERATE_PATH).await.len(), 2);
}

#[tokio::test]
async fn test_missing_cookies_fail_without_network() {
    let mock = MockGeminiWeb::start().await;
    let server = relay_for(&mock, &[("SECURE_1PSID", ""), ("SECURE_1PSIDTS", "")]);

    let response = server
        .post("/v1/chat/completions")
        .json(&test_data::hello_request())
        .await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    assert!(mock.received_requests().await.is_empty());
}

#[tokio::test]
async fn test_image_uploaded_before_generate() {
    let mock = MockGeminiWeb::start().await;
    mock.mock_app_page().await;
    mock.mock_upload("/contrib_service/ttl_1d/upload-1").await;
    mock.mock_generate_text("A red pixel.").await;
    let server = relay_for(&mock, &[]);

    let url = format!("data:image/png;base64,{}", test_data::RED_PIXEL_PNG);
    server
        .post("/v1/chat/completions")
        .json(&test_data::image_request(&url))
        .await
        .assert_status_ok();

    assert_eq!(mock.requests_to("/upload").await.len(), 1);

    let generate = mock.requests_to(GENERATE_PATH).await;
    let f_req: Value = serde_json::from_str(&form_field(&generate[0].body, "f.req").unwrap()).unwrap();
    let inner: Value = serde_json::from_str(f_req[1].as_str().unwrap()).unwrap();
    assert_eq!(inner[0][3][0][0][0], "/contrib_service/ttl_1d/upload-1");
    assert_eq!(inner[0][3][0][1], "image-1.png");
}

#[tokio::test]
async fn test_thoughts_and_web_images_rendered() {
    let mock = MockGeminiWeb::start().await;
    mock.mock_app_page().await;

    let mut candidate = vec![Value::Null; 38];
    candidate[0] = json!("rc_1");
    candidate[1] = json!(["Here is a cat"]);
    let mut media = vec![Value::Null; 8];
    media[1] = json!([[
        [["https://img.example/cat.jpg"], null, null, null, "a cat"],
        null, null, null, null, null, null,
        ["Cat"]
    ]]);
    candidate[12] = Value::Array(media);
    candidate[37] = json!([["the user wants a cat"]]);
    mock.mock_generate_candidate(Value::Array(candidate)).await;

    let server = relay_for(&mock, &[]);
    let body: Value = server
        .post("/v1/chat/completions")
        .json(&test_data::hello_request())
        .await
        .json();

    assert_eq!(
        body["choices"][0]["message"]["content"],
        "<think>the user wants a cat</think>Here is a cat\n\n![Cat](https://img.example/cat.jpg)"
    );
}
