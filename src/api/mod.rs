//! HTTP API for scan classification and prediction history

pub mod error;

use crate::config::ServerConfig;
use crate::service::ClassificationService;
use crate::statistics::StatisticsResponse;
use crate::types::prediction::{PredictionResult, StoredPrediction};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

pub use error::ApiError;

const DEFAULT_RECENT_LIMIT: usize = 10;

/// Shared state for request handlers
pub struct AppState {
    pub service: Arc<ClassificationService>,
}

impl AppState {
    pub fn new(service: Arc<ClassificationService>) -> Arc<Self> {
        Arc::new(Self { service })
    }
}

/// Result of a classification, with the stored id
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    #[serde(flatten)]
    pub result: PredictionResult,
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub report: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub stored_predictions: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

/// Uploaded scan pulled out of a multipart body
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

/// Build the application router
pub fn construct_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let predictions = Router::new()
        .route("/predict", post(create_prediction))
        .route("/predict/", post(create_prediction))
        .route("/predict/report", post(prediction_report))
        .route("/predict/report/", post(prediction_report))
        .route("/predictions", get(recent_predictions))
        .route("/predictions/", get(recent_predictions))
        .route("/statistics", get(statistics))
        .route("/statistics/", get(statistics));

    let prefix = config.api_prefix.trim_end_matches('/');
    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health));
    let router = if prefix.is_empty() {
        router.merge(predictions)
    } else {
        router.nest(prefix, predictions)
    };

    router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|origin| origin == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Welcome to the Brain Tumor Detection API!"
    }))
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, ApiError> {
    let stored_predictions = state.service.stored_count().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        model: state.service.model_phase().as_str().to_string(),
        stored_predictions,
    }))
}

/// Read the `file` field, requiring an image content type
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(ApiError::bad_request("File must be an image"));
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|e| {
            if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                ApiError::payload_too_large(e.body_text())
            } else {
                ApiError::bad_request(format!("Failed to read upload: {}", e))
            }
        })?;

        debug!(file = %file_name, bytes = bytes.len(), "Received upload");
        return Ok(Upload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::bad_request("Missing multipart field 'file'"))
}

async fn create_prediction(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<PredictResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let stored = state
        .service
        .classify_and_store(&upload.file_name, upload.bytes)
        .await?;

    Ok(Json(PredictResponse {
        id: stored.id,
        result: stored.result,
    }))
}

async fn prediction_report(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ReportResponse>, ApiError> {
    let upload = read_upload(multipart).await?;
    let result = state.service.classify(upload.bytes).await?;

    Ok(Json(ReportResponse {
        report: state.service.report(&result),
    }))
}

async fn recent_predictions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<StoredPrediction>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(state.service.recent(limit).await?))
}

async fn statistics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatisticsResponse>, ApiError> {
    let summary = state.service.statistics().await?;
    Ok(Json(summary.to_response()))
}
