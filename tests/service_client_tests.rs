//! Mock HTTP tests for the four service clients.
//!
//! These tests cover request formatting, response parsing, the metadata
//! fallback behavior, and error mapping for non-success statuses.

use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use spectra_studio::services::{
    Attachment, ChatMessage, CodegenClient, ImageGenClient, ImageMetadata, MetadataClient,
    ServiceError, UpscaleClient, DEFAULT_SUBJECT,
};
use spectra_studio::vfs::{FileMap, VirtualFile};

fn image_response(data: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": {
                "parts": [
                    { "text": "Here is your image." },
                    { "inlineData": { "mimeType": "image/png", "data": data } }
                ]
            }
        }]
    })
}

// === Image generation ===

#[tokio::test]
async fn test_generate_sends_authorization_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash-image"))
        .and(header("Authorization", "Key test-api-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        ImageGenClient::with_base_url("test-api-key".to_string(), mock_server.uri()).unwrap();
    let candidates = client.generate_candidates("a fox", None).await.unwrap();

    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].data, "QUJD");
    assert_eq!(candidates[0].mime_type, "image/png");
    assert_eq!(candidates[0].prompt, "a fox");
}

#[tokio::test]
async fn test_generate_empty_prompt_uses_default_subject() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash-image"))
        .and(body_string_contains(DEFAULT_SUBJECT))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ImageGenClient::with_base_url("k".to_string(), mock_server.uri()).unwrap();
    let candidates = client.generate_candidates("", None).await.unwrap();

    assert_eq!(candidates[0].prompt, DEFAULT_SUBJECT);
}

#[tokio::test]
async fn test_generate_with_reference_uses_redraw_template() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash-image"))
        .and(body_string_contains("REDRAW THIS IMAGE AS A CLEAN VECTOR"))
        .and(body_string_contains("\"inlineData\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_response("QUJD")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = ImageGenClient::with_base_url("k".to_string(), mock_server.uri()).unwrap();
    let reference = Attachment::new("sketch.png", "image/png", "ZGF0YQ==");
    let candidates = client
        .generate_candidates("", Some(&reference))
        .await
        .unwrap();

    assert_eq!(candidates.len(), 1);
}

#[tokio::test]
async fn test_generate_no_inline_parts_is_empty_not_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "filtered" }] } }]
        })))
        .mount(&mock_server)
        .await;

    let client = ImageGenClient::with_base_url("k".to_string(), mock_server.uri()).unwrap();
    let candidates = client.generate_candidates("a fox", None).await.unwrap();

    assert!(candidates.is_empty());
}

#[tokio::test]
async fn test_generate_maps_non_success_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gemini-2.5-flash-image"))
        .respond_with(ResponseTemplate::new(403).set_body_string("content policy"))
        .mount(&mock_server)
        .await;

    let client = ImageGenClient::with_base_url("k".to_string(), mock_server.uri()).unwrap();
    let result = client.generate_candidates("a fox", None).await;

    match result {
        Err(ServiceError::Api { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, "content policy");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

// === Metadata ===

#[tokio::test]
async fn test_metadata_parses_clean_json_content() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .and(body_string_contains("data:image/png;base64,QUJD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": {
                "content": "{\"titles\": [\"Wolf Logo\"], \"keywords\": [\"wolf\", \"logo\"]}"
            }}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = MetadataClient::with_base_url(mock_server.uri()).unwrap();
    let metadata = client.fetch("QUJD", "image/png").await.unwrap();

    assert_eq!(metadata.titles, vec!["Wolf Logo"]);
    assert_eq!(metadata.keywords, vec!["wolf", "logo"]);
}

#[tokio::test]
async fn test_metadata_garbage_content_yields_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": { "content": "Sorry, I can't describe this image." } }]
        })))
        .mount(&mock_server)
        .await;

    let client = MetadataClient::with_base_url(mock_server.uri()).unwrap();
    let metadata = client.fetch("QUJD", "image/png").await.unwrap();

    assert_eq!(metadata, ImageMetadata::fallback());
    assert_eq!(metadata.titles.len(), 5);
    assert_eq!(metadata.keywords.len(), 45);
}

#[tokio::test]
async fn test_metadata_fenced_json_is_unwrapped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{ "message": {
                "content": "```json\n{\"titles\": [\"Fenced\"], \"keywords\": [\"k\"]}\n```"
            }}]
        })))
        .mount(&mock_server)
        .await;

    let client = MetadataClient::with_base_url(mock_server.uri()).unwrap();
    let metadata = client.fetch("QUJD", "image/png").await.unwrap();

    assert_eq!(metadata.titles, vec!["Fenced"]);
}

#[tokio::test]
async fn test_metadata_non_success_status_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&mock_server)
        .await;

    let client = MetadataClient::with_base_url(mock_server.uri()).unwrap();
    let result = client.fetch("QUJD", "image/png").await;

    assert!(matches!(
        result,
        Err(ServiceError::Api { status: 500, .. })
    ));
}

// === Upscale ===

#[tokio::test]
async fn test_upscale_returns_raw_bytes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upscale"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0x01, 0x02]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = UpscaleClient::with_base_url(mock_server.uri()).unwrap();
    let bytes = client.upscale(vec![1, 2, 3], "image/png").await.unwrap();

    assert_eq!(bytes, vec![0xFF, 0xD8, 0x01, 0x02]);
}

#[tokio::test]
async fn test_upscale_sends_multipart_mode_field() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upscale"))
        .and(body_string_contains("name=\"mode\""))
        .and(body_string_contains("x2"))
        .and(body_string_contains("input.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = UpscaleClient::with_base_url(mock_server.uri()).unwrap();
    client.upscale(vec![9, 9], "image/png").await.unwrap();
}

#[tokio::test]
async fn test_upscale_non_success_status_is_fatal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upscale"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&mock_server)
        .await;

    let client = UpscaleClient::with_base_url(mock_server.uri()).unwrap();
    let result = client.upscale(vec![1], "image/png").await;

    assert!(matches!(
        result,
        Err(ServiceError::Api { status: 503, .. })
    ));
}

// === Code generation ===

#[tokio::test]
async fn test_codegen_empty_project_sends_placeholder_context() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gemini-3-pro-preview"))
        .and(header("Authorization", "Key builder-key"))
        .and(body_string_contains("Empty Project"))
        .and(body_string_contains("User Request: build a landing page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "buildSteps": ["Creating index.html..."],
            "files": [
                { "name": "index.html", "content": "<html></html>", "language": "html" }
            ],
            "previewSnapshot": "Blank page",
            "summary": "Done. Next?"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client =
        CodegenClient::with_base_url("builder-key".to_string(), mock_server.uri()).unwrap();
    let response = client
        .generate_project("build a landing page", &FileMap::new(), &[], None)
        .await
        .unwrap();

    assert_eq!(response.files.len(), 1);
    assert_eq!(response.summary, "Done. Next?");
    assert_eq!(response.build_steps, vec!["Creating index.html..."]);
}

#[tokio::test]
async fn test_codegen_sends_text_files_and_history() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gemini-3-pro-preview"))
        .and(body_string_contains("File: app.js"))
        .and(body_string_contains("USER: make it blue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut files = FileMap::new();
    files.insert(
        "app.js".to_string(),
        VirtualFile::new("app.js", "let x = 1;", "javascript"),
    );
    files.insert(
        "logo.png".to_string(),
        VirtualFile::new("logo.png", "data:image/png;base64,AAAA", "binary"),
    );
    let history = vec![ChatMessage::user("make it blue")];

    let client = CodegenClient::with_base_url("k".to_string(), mock_server.uri()).unwrap();
    let response = client
        .generate_project("darker", &files, &history, None)
        .await
        .unwrap();

    // Missing fields in the empty response body are defaulted, not rejected.
    assert!(response.files.is_empty());
    assert_eq!(response.build_steps, vec!["Processing..."]);
    assert_eq!(response.preview_snapshot, "Preview updated.");
    assert_eq!(response.summary, "");
}

#[tokio::test]
async fn test_codegen_non_success_status_is_an_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/gemini-3-pro-preview"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&mock_server)
        .await;

    let client = CodegenClient::with_base_url("k".to_string(), mock_server.uri()).unwrap();
    let result = client
        .generate_project("anything", &FileMap::new(), &[], None)
        .await;

    assert!(matches!(
        result,
        Err(ServiceError::Api { status: 429, .. })
    ));
}
