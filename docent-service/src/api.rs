//! HTTP API for the Docent service.
//!
//! This module provides the REST API endpoints for:
//! - Synchronous and background document analysis
//! - Task status, listing, cancellation and deletion
//! - The in-memory item resource
//! - Health, metrics and model listing

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{delete, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ServiceError;
use crate::ollama::ModelInfo;
use crate::service::DocentService;

pub mod analysis;
pub mod items;
pub mod tasks;
use analysis::{analyze_async_handler, analyze_handler};
use items::{
    create_item_handler, delete_item_handler, get_item_handler, list_items_handler,
    update_item_handler,
};
use tasks::{cancel_task_handler, delete_task_handler, list_tasks_handler, task_status_handler};

/// Room for multipart framing and form fields on top of the document itself
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Application state
pub struct AppState {
    pub service: Arc<DocentService>,
    pub start_time: Instant,
    pub metrics: Option<PrometheusHandle>,
}

/// Response for cancel and delete operations
#[derive(Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

/// Build the API router
pub fn router(service: Arc<DocentService>, metrics: Option<PrometheusHandle>) -> Router {
    let max_body_size =
        service.config.limits.max_document_size_bytes as usize + MULTIPART_OVERHEAD_BYTES;

    let state = Arc::new(AppState {
        service,
        start_time: Instant::now(),
        metrics,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/models", get(models_handler))
        // Analysis endpoints - with larger body limit for file uploads
        .route(
            "/analyze",
            post(analyze_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        .route(
            "/analyze-async",
            post(analyze_async_handler).layer(DefaultBodyLimit::max(max_body_size)),
        )
        // Task endpoints
        .route("/tasks", get(list_tasks_handler))
        .route("/tasks/{id}", delete(delete_task_handler))
        .route("/tasks/{id}/status", get(task_status_handler))
        .route("/tasks/{id}/cancel", post(cancel_task_handler))
        // Item endpoints
        .route("/items", get(list_items_handler).post(create_item_handler))
        .route(
            "/items/{id}",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// === Health & Metrics ===

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ollama_available = state.service.ollama.health_check().await;

    let status = if ollama_available {
        "healthy".to_string()
    } else {
        "degraded: Ollama unavailable".to_string()
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        ollama_available,
        tasks: state.service.tasks.count(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    uptime_seconds: u64,
    ollama_available: bool,
    tasks: usize,
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default();

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
}

// === Models ===

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

async fn models_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelsResponse>, ServiceError> {
    let models = state.service.list_models().await?;
    Ok(Json(ModelsResponse { models }))
}
