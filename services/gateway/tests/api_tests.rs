//! End-to-end tests against the real router: in-memory requests via
//! `tower::ServiceExt::oneshot`, provider traffic stubbed with wiremock,
//! workbook fixtures generated on the fly.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::path::Path;
use tower::ServiceExt;
use wiremock::matchers::{method, path as url_path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sheetforge_gateway::{create_app, AppState};
use sheetforge_utils::{read_workbook, AppConfig};

const BOUNDARY: &str = "sheetforge-test-boundary";

fn test_config(dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.storage.upload_dir = dir.join("uploads");
    config.storage.output_dir = dir.join("outputs");
    config.storage.template_path = dir.join("template.xlsx");
    config.logging.file_path = None;
    std::fs::create_dir_all(&config.storage.upload_dir).unwrap();
    std::fs::create_dir_all(&config.storage.output_dir).unwrap();
    config
}

fn with_openai(mut config: AppConfig, api_base: &str) -> AppConfig {
    config.openai.api_key = Some("sk-test".to_string());
    config.openai.api_base = api_base.to_string();
    config
}

/// Template fixture: a `Summary` sheet expecting Name/Quantity rows.
fn write_template(path: &Path) {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Summary").unwrap();
    sheet.write_string(0, 0, "Name").unwrap();
    sheet.write_string(0, 1, "Quantity").unwrap();
    sheet.write_string(1, 0, "Acme").unwrap();
    sheet.write_number(1, 1, 0.0).unwrap();
    workbook.save(path).unwrap();
}

fn workbook_bytes(sheet_name: &str, columns: (&str, &str), row: (&str, f64)) -> Vec<u8> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name).unwrap();
    sheet.write_string(0, 0, columns.0).unwrap();
    sheet.write_string(0, 1, columns.1).unwrap();
    sheet.write_string(1, 0, row.0).unwrap();
    sheet.write_number(1, 1, row.1).unwrap();
    workbook.save_to_buffer().unwrap()
}

fn multipart_request(field: &str, filename: &str, data: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::post("/api/upload/excel")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_fixed_body() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(AppState::from_config(test_config(dir.path())));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response_json(response).await,
        json!({"message": "project running"})
    );
}

#[tokio::test]
async fn status_reports_missing_keys() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(AppState::from_config(test_config(dir.path())));

    let response = app
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["openai_configured"], json!(false));
    assert_eq!(body["openai_provider"], json!("openai"));
    assert_eq!(body["anthropic_configured"], json!(false));
    assert_eq!(body["excel_processor_configured"], json!(false));
    assert_eq!(body["missing_keys"], json!(["OPENAI_API_KEY"]));
    assert_eq!(body["openai_config"]["model"], json!("gpt-3.5-turbo"));
    assert!(body.get("azure_config").is_none());
}

#[tokio::test]
async fn status_reports_configured_provider() {
    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), "https://api.openai.com/v1");
    write_template(&config.storage.template_path);
    let app = create_app(AppState::from_config(config));

    let response = app
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = response_json(response).await;
    assert_eq!(body["openai_configured"], json!(true));
    assert_eq!(body["excel_processor_configured"], json!(true));
    assert_eq!(body["missing_keys"], json!([]));
}

#[tokio::test]
async fn upload_rejects_disallowed_extension() {
    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), "http://127.0.0.1:9");
    write_template(&config.storage.template_path);
    let app = create_app(AppState::from_config(config));

    let response = app
        .oneshot(multipart_request("file", "data.csv", b"a,b\n1,2\n"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(
        body["error"],
        json!("Invalid file type. Only .xlsx and .xls files are allowed")
    );
    assert_eq!(body["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn upload_rejects_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), "http://127.0.0.1:9");
    write_template(&config.storage.template_path);
    let app = create_app(AppState::from_config(config));

    let oversized = vec![0u8; 16 * 1024 * 1024 + 1];
    let response = app
        .oneshot(multipart_request("file", "big.xlsx", &oversized))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response_json(response).await;
    assert_eq!(body["error"], json!("File too large. Maximum size is 16MB"));
}

#[tokio::test]
async fn upload_without_file_field_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), "http://127.0.0.1:9");
    write_template(&config.storage.template_path);
    let app = create_app(AppState::from_config(config));

    let response = app
        .oneshot(multipart_request("other", "data.xlsx", b"irrelevant"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["error"], json!("No file provided"));
}

#[tokio::test]
async fn upload_without_processor_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(AppState::from_config(test_config(dir.path())));

    let response = app
        .oneshot(multipart_request("file", "data.xlsx", b"irrelevant"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response_json(response).await["code"], json!("CONFIGURATION_ERROR"));
}

#[tokio::test]
async fn upload_with_matching_labels_skips_the_provider() {
    let dir = tempfile::tempdir().unwrap();
    // Any provider call would hit a closed port and fail the request.
    let config = with_openai(test_config(dir.path()), "http://127.0.0.1:9");
    write_template(&config.storage.template_path);
    let upload_dir = config.storage.upload_dir.clone();
    let output_dir = config.storage.output_dir.clone();
    let app = create_app(AppState::from_config(config));

    let upload = workbook_bytes("Summary", ("Name", "Quantity"), ("Acme", 5.0));
    let response = app
        .clone()
        .oneshot(multipart_request("file", "sample.xlsx", &upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["message"], json!("File processed successfully"));
    let output_file = body["output_file"].as_str().unwrap().to_string();
    assert_eq!(
        body["download_url"],
        json!(format!("/api/download/{}", output_file))
    );

    // The temporary upload is gone
    assert_eq!(std::fs::read_dir(&upload_dir).unwrap().count(), 0);

    // The produced workbook is downloadable and carries the mapped row
    let response = app
        .oneshot(
            Request::get(format!("/api/download/{}", output_file))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let saved = output_dir.join("downloaded.xlsx");
    std::fs::write(&saved, &bytes).unwrap();
    let data = read_workbook(&saved).unwrap();
    let summary = data.sheet("Summary").unwrap();
    assert_eq!(summary.columns, vec!["Name", "Quantity"]);
    assert_eq!(summary.rows[0][0], json!("Acme"));
    assert_eq!(summary.rows[0][1], json!(5.0));
}

#[tokio::test]
async fn upload_uses_provider_for_unmatched_data() {
    let server = MockServer::start().await;
    let mapped = json!({"sheets": {"Summary": [{"Name": "Acme", "Quantity": 5}]}});
    Mock::given(method("POST"))
        .and(url_path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": mapped.to_string()},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), &server.uri());
    write_template(&config.storage.template_path);
    let upload_dir = config.storage.upload_dir.clone();
    let app = create_app(AppState::from_config(config));

    let upload = workbook_bytes("Raw Export", ("Company", "Qty"), ("Acme", 5.0));
    let response = app
        .oneshot(multipart_request("file", "export.xlsx", &upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response_json(response).await["output_file"]
        .as_str()
        .unwrap()
        .starts_with("processed_"));
    assert_eq!(std::fs::read_dir(&upload_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_cleans_up_after_provider_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(url_path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), &server.uri());
    write_template(&config.storage.template_path);
    let upload_dir = config.storage.upload_dir.clone();
    let app = create_app(AppState::from_config(config));

    let upload = workbook_bytes("Raw Export", ("Company", "Qty"), ("Acme", 5.0));
    let response = app
        .oneshot(multipart_request("file", "export.xlsx", &upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response_json(response).await["code"], json!("UPSTREAM_ERROR"));
    assert_eq!(std::fs::read_dir(&upload_dir).unwrap().count(), 0);
}

#[tokio::test]
async fn upload_rejects_unusable_ai_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(url_path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "{\"rows\": []}"},
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), &server.uri());
    write_template(&config.storage.template_path);
    let app = create_app(AppState::from_config(config));

    let upload = workbook_bytes("Raw Export", ("Company", "Qty"), ("Acme", 5.0));
    let response = app
        .oneshot(multipart_request("file", "export.xlsx", &upload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response_json(response).await["code"], json!("PROCESSING_ERROR"));
}

#[tokio::test]
async fn openai_chat_returns_normalized_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(url_path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), &server.uri());
    let app = create_app(AppState::from_config(config));

    let response = app
        .oneshot(json_request(
            "/api/openai/chat",
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({"content": "hello"}));
}

#[tokio::test]
async fn chat_with_empty_messages_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(AppState::from_config(test_config(dir.path())));

    for uri in ["/api/openai/chat", "/api/anthropic/chat"] {
        let response = app
            .clone()
            .oneshot(json_request(uri, json!({"messages": []})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response_json(response).await["error"],
            json!("Messages are required")
        );
    }
}

#[tokio::test]
async fn chat_with_malformed_body_gets_json_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(AppState::from_config(test_config(dir.path())));

    // Wrong-shaped but syntactically valid JSON
    for uri in ["/api/openai/chat", "/api/anthropic/chat"] {
        let response = app
            .clone()
            .oneshot(json_request(uri, json!({"messages": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {}", uri);

        let body = response_json(response).await;
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
        assert!(body["error"].as_str().unwrap().len() > 0);
    }

    // Not JSON at all
    let response = app
        .oneshot(
            Request::post("/api/openai/chat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{messages"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn anthropic_chat_without_key_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(AppState::from_config(test_config(dir.path())));

    let response = app
        .oneshot(json_request(
            "/api/anthropic/chat",
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response_json(response).await["error"],
        json!("Anthropic API key not configured")
    );
}

#[tokio::test]
async fn anthropic_chat_proxies_the_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(url_path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "hello"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.anthropic.api_key = Some("sk-ant-test".to_string());
    config.anthropic.api_base = server.uri();
    let app = create_app(AppState::from_config(config));

    let response = app
        .oneshot(json_request(
            "/api/anthropic/chat",
            json!({"messages": [{"role": "user", "content": "hi"}], "max_tokens": 64}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await, json!({"content": "hello"}));
}

#[tokio::test]
async fn chat_upstream_failure_maps_to_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(url_path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = with_openai(test_config(dir.path()), &server.uri());
    let app = create_app(AppState::from_config(config));

    let response = app
        .oneshot(json_request(
            "/api/openai/chat",
            json!({"messages": [{"role": "user", "content": "hi"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body = response_json(response).await;
    assert_eq!(body["code"], json!("UPSTREAM_ERROR"));
    assert!(body["error"].as_str().unwrap().contains("status 500"));
}

#[tokio::test]
async fn download_rejects_missing_and_unsafe_names() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(AppState::from_config(test_config(dir.path())));

    for name in ["missing.xlsx", "a..b.xlsx", ".env.xlsx", "report.csv"] {
        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/api/download/{}", name))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "name: {}", name);
    }
}

#[tokio::test]
async fn requests_echo_a_request_id() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_app(AppState::from_config(test_config(dir.path())));

    let response = app
        .clone()
        .oneshot(
            Request::get("/health")
                .header("x-request-id", "test-id-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "test-id-123");

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(!response.headers()["x-request-id"].is_empty());
}
