//! Remote image attachment tests
//!
//! `http(s)` image references are downloaded by the relay before the
//! backend is called; the image host is a wiremock server.

use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::common::{test_data, TestApp};

fn red_pixel() -> Vec<u8> {
    STANDARD.decode(test_data::RED_PIXEL_PNG).unwrap()
}

async fn image_host(route: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_remote_image_downloaded_into_attachment() {
    let host = image_host(
        "/photos/cat.jpg",
        ResponseTemplate::new(200)
            .insert_header("content-type", "image/jpeg")
            .set_body_bytes(red_pixel()),
    )
    .await;
    let app = TestApp::open();

    let url = format!("{}/photos/cat.jpg", host.uri());
    app.server
        .post("/v1/chat/completions")
        .json(&test_data::image_request(&url))
        .await
        .assert_status_ok();

    let calls = app.backend.calls();
    assert_eq!(calls.len(), 1);
    let attachment = &calls[0].attachments[0];
    assert_eq!(attachment.filename, "image-1.jpg");
    assert_eq!(attachment.mime_type, "image/jpeg");
    assert_eq!(attachment.data.as_ref(), red_pixel().as_slice());
    assert!(calls[0].prompt.contains("[Image 1]"));
}

#[tokio::test]
async fn test_remote_image_not_found_is_attachment_error() {
    let host = image_host("/missing.png", ResponseTemplate::new(404)).await;
    let app = TestApp::open();

    let url = format!("{}/missing.png", host.uri());
    let response = app
        .server
        .post("/v1/chat/completions")
        .json(&test_data::image_request(&url))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "attachment_decode_error");
    assert_eq!(app.backend.call_count(), 0);
}

#[tokio::test]
async fn test_remote_image_without_image_type_defaults_to_png() {
    let host = image_host(
        "/blob",
        ResponseTemplate::new(200)
            .insert_header("content-type", "application/octet-stream")
            .set_body_bytes(red_pixel()),
    )
    .await;
    let app = TestApp::open();

    let url = format!("{}/blob", host.uri());
    app.server
        .post("/v1/chat/completions")
        .json(&test_data::image_request(&url))
        .await
        .assert_status_ok();

    let attachment = &app.backend.calls()[0].attachments[0];
    assert_eq!(attachment.mime_type, "image/png");
    assert_eq!(attachment.filename, "image-1.png");
}
