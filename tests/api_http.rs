//! HTTP-level tests for the REST API against the in-memory store.
//!
//! Run with: cargo test --test api_http

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use site_office::api::{create_router, AppState};
use site_office::{DocumentGenerator, LearningLibrary, MemoryCommandStore};

// ── Test app builder ───────────────────────────────────────────

fn build_test_app(learning_dir: &std::path::Path) -> axum::Router {
    let state = AppState {
        store: Arc::new(MemoryCommandStore::new()),
        generator: Arc::new(DocumentGenerator::new().unwrap()),
        learning: Arc::new(LearningLibrary::new(learning_dir)),
        disk: None,
    };
    create_router(state)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body.to_vec())
}

async fn send_json(app: &axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(app, request).await;
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

// ── Health and catalog ─────────────────────────────────────────

#[tokio::test]
async fn health_reports_backend() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let (status, body) = send_json(&app, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["store"], "memory");
    assert_eq!(body["data"]["disk_configured"], false);
}

#[tokio::test]
async fn templates_are_listed() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let (status, body) = send_json(&app, get("/api/templates")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]["templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["handover_act", "defect_report", "work_report", "letter"]
    );
    assert!(body["data"]["letter_styles"].as_array().unwrap().len() >= 2);
}

// ── Commands ───────────────────────────────────────────────────

#[tokio::test]
async fn command_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let (status, body) = send_json(
        &app,
        post_json(
            "/api/commands",
            json!({ "text": "create handover act for apartment 12a" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["action"]["type"], "create_document");
    assert_eq!(body["data"]["action"]["template_type"], "handover_act");
    assert_eq!(body["data"]["action"]["params"]["apartment"], "12A");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(&app, get(&format!("/api/commands/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = send_json(&app, get("/api/commands?status=pending")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let request = Request::builder()
        .method("PATCH")
        .uri(format!("/api/commands/{}/status", id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "status": "failed", "error": "cancelled by operator" }).to_string(),
        ))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "failed");
    assert_eq!(body["data"]["error"], "cancelled by operator");

    let (_, body) = send_json(&app, get("/api/commands?status=pending")).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/api/commands/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send_json(&app, get(&format!("/api/commands/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn explicit_action_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let (status, body) = send_json(
        &app,
        post_json(
            "/api/commands",
            json!({
                "action": {
                    "type": "print_document",
                    "file_path": "generated/act.docx",
                    "copies": 2
                }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["action"]["type"], "print_document");
    assert_eq!(body["data"]["action"]["copies"], 2);
    assert!(body["data"]["text"].is_null());
}

#[tokio::test]
async fn unintelligible_command_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let (status, body) =
        send_json(&app, post_json("/api/commands", json!({ "text": "hello there" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());

    let (status, _) = send_json(&app, post_json("/api/commands", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_command_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let uri = format!("/api/commands/{}", uuid::Uuid::new_v4());
    let (status, _) = send_json(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Documents ──────────────────────────────────────────────────

#[tokio::test]
async fn generate_returns_docx_attachment() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let request = post_json(
        "/api/documents/generate",
        json!({
            "template_type": "handover_act",
            "params": { "apartment": "45", "date": "03.07.2024" }
        }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers().clone();
    assert!(headers[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .contains("wordprocessingml"));
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("handover_act_kv45_03.07.2024.docx"));
    assert_eq!(headers["x-document-sha256"].len(), 64);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..2], b"PK");

    // Round trip through the analyzer endpoint
    let request = Request::builder()
        .method("POST")
        .uri("/api/documents/analyze")
        .body(Body::from(bytes))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["detected_type"], "handover_act");
    assert!(body["data"]["table_count"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn generate_inline_returns_base64() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let (status, body) = send_json(
        &app,
        post_json(
            "/api/documents/generate",
            json!({
                "template_type": "letter",
                "inline": true,
                "params": {
                    "recipient": "Иванову И.И.",
                    "subject": "согласовании графика работ",
                    "body": ["Просим согласовать график."],
                    "style": "underlined"
                }
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["template_type"], "letter");
    assert_eq!(body["data"]["sha256"].as_str().unwrap().len(), 64);
    assert!(body["data"]["content_base64"].as_str().unwrap().len() > 100);
}

#[tokio::test]
async fn generate_missing_field_is_bad_request() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let (status, body) = send_json(
        &app,
        post_json(
            "/api/documents/generate",
            json!({ "template_type": "letter", "params": {} }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("recipient"));
}

#[tokio::test]
async fn analyze_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let request = Request::builder()
        .method("POST")
        .uri("/api/documents/analyze")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let request = Request::builder()
        .method("POST")
        .uri("/api/documents/analyze")
        .body(Body::from("not a zip file"))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
}

// ── Learning ───────────────────────────────────────────────────

#[tokio::test]
async fn learning_example_is_stored_and_listed() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let request = post_json(
        "/api/documents/generate",
        json!({ "template_type": "defect_report", "params": { "apartment": "7" } }),
    );
    let (status, bytes) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method("POST")
        .uri("/api/learning/examples?name=defects_sample.docx")
        .body(Body::from(bytes))
        .unwrap();
    let (status, body) = send_json(&app, request).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["template_type"], "defect_report");
    assert!(dir.path().join("defects_sample.docx").exists());

    let (status, body) = send_json(&app, get("/api/learning/examples")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = send_json(&app, get("/api/health")).await;
    assert_eq!(body["data"]["learning_examples"], 1);
}

// ── Disk ───────────────────────────────────────────────────────

#[tokio::test]
async fn disk_without_token_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let app = build_test_app(dir.path());

    let (status, body) = send_json(&app, get("/api/disk/list?path=disk:/")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}
