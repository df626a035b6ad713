//! HTTP query surface

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::error::{parse_id, GradeError};
use crate::grading;
use crate::models::{ClassAverage, ClassStats, GlobalStats};
use crate::store::GradeStore;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn GradeStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn GradeStore>) -> Self {
        Self { store }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/grades/learner/:id/avg-class", get(learner_class_averages))
        .route("/grades/stats", get(global_stats))
        .route("/grades/stats/:id", get(class_stats))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
    request_timeout: Duration,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("grade stats listening on {}", addr);

    axum::serve(listener, create_router(state, request_timeout))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn learner_class_averages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ClassAverage>>, GradeError> {
    let learner_id = parse_id(&id, "learner id")?;
    let records = state.store.records_for_learner(learner_id).await?;
    Ok(Json(grading::learner_class_averages(&records, learner_id)))
}

async fn global_stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GlobalStats>, GradeError> {
    let records = state.store.all_records().await?;
    let stats = grading::global_stats(&records)?;
    Ok(Json(stats.into()))
}

async fn class_stats(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ClassStats>, GradeError> {
    let class_id = parse_id(&id, "class id")?;
    let records = state.store.records_for_class(class_id).await?;
    Ok(Json(grading::class_stats(&records, class_id)?))
}
