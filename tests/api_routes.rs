mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use brain_tumor_detection::api::{construct_router, AppState};
use brain_tumor_detection::config::ServerConfig;
use brain_tumor_detection::store::MemoryPredictionStore;
use brain_tumor_detection::ClassificationService;
use common::{png_bytes, FixedLoader};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "scan-boundary";

fn app(loader: FixedLoader) -> Router {
    let store = Arc::new(MemoryPredictionStore::new());
    let service = Arc::new(ClassificationService::new(Box::new(loader), store, 98.0, 2));
    construct_router(AppState::new(service), &ServerConfig::default())
}

fn multipart_request(uri: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        b"Content-Disposition: form-data; name=\"file\"; filename=\"scan.png\"\r\n",
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_root_message() {
    let app = app(FixedLoader::new(vec![1.0]));
    let (status, body) = send(&app, get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to the Brain Tumor Detection API!");
}

#[tokio::test]
async fn test_predict_stores_and_returns_id() {
    let app = app(FixedLoader::new(vec![0.70, 0.10, 0.10, 0.10]));

    let (status, body) = send(
        &app,
        multipart_request("/api/v1/predict/", "image/png", &png_bytes()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], "glioma");
    assert_eq!(body["tumor_type"], "Glioma Tumor");
    assert_eq!(body["model_accuracy"], 98.0);
    assert!(body["_id"].as_str().is_some_and(|id| !id.is_empty()));

    let (status, body) = send(&app, get("/api/v1/predictions/?limit=5")).await;
    assert_eq!(status, StatusCode::OK);
    let predictions = body.as_array().unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0]["image_name"], "scan.png");
    assert_eq!(predictions[0]["diagnosis"], "Brain tumor detected.");
}

#[tokio::test]
async fn test_rejects_non_image_upload() {
    let app = app(FixedLoader::new(vec![1.0]));
    let (status, body) = send(
        &app,
        multipart_request("/api/v1/predict/", "text/plain", b"hello"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "File must be an image");
}

#[tokio::test]
async fn test_malformed_image_is_client_error() {
    let app = app(FixedLoader::new(vec![1.0]));
    let (status, body) = send(
        &app,
        multipart_request("/api/v1/predict/", "image/png", b"garbage"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_IMAGE");
}

#[tokio::test]
async fn test_model_failure_is_server_error() {
    let app = app(FixedLoader::failing());
    let (status, body) = send(
        &app,
        multipart_request("/api/v1/predict/", "image/png", &png_bytes()),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "MODEL_UNAVAILABLE");
}

#[tokio::test]
async fn test_report_endpoint() {
    let app = app(FixedLoader::new(vec![0.05, 0.10, 0.80, 0.05]));
    let (status, body) = send(
        &app,
        multipart_request("/api/v1/predict/report/", "image/jpeg", &png_bytes()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let report = body["report"].as_str().unwrap();
    assert!(report.contains("Prediction: notumor\n"));
    assert!(!report.contains("Tumor Type:"));

    // The report endpoint does not store
    let (_, stats) = send(&app, get("/api/v1/statistics/")).await;
    assert_eq!(stats["total_predictions"], 0);
}

#[tokio::test]
async fn test_statistics() {
    let app = app(FixedLoader::new(vec![0.1, 0.1, 0.7, 0.1]));
    for _ in 0..2 {
        send(
            &app,
            multipart_request("/api/v1/predict/", "image/png", &png_bytes()),
        )
        .await;
    }

    let (status, body) = send(&app, get("/api/v1/statistics/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_predictions"], 2);
    assert_eq!(body["tumor_types"]["notumor"]["count"], 2);
    assert_eq!(body["tumor_types"]["notumor"]["percentage"], 100.0);
    assert_eq!(body["has_tumor"], 0);
    assert_eq!(body["no_tumor"], 2);
}

#[tokio::test]
async fn test_health_reports_model_phase() {
    let app = app(FixedLoader::new(vec![1.0]));
    let (status, body) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["model"], "unloaded");
    assert_eq!(body["stored_predictions"], 0);
}
