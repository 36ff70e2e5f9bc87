// src/api.rs
//! Read/trigger API for the dashboard: the visible subset, facets, signals
//! and the manual actions (force sync, load more, filter changes, export).

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::engine::{FeedEngine, FeedView, SignalView, TickReport};
use crate::error::FeedError;
use crate::filter::FilterConfig;
use crate::model::Event;
use crate::sync::{PageOutcome, PaginationState};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FeedEngine>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/view", get(view))
        .route("/api/events", get(events))
        .route("/api/signals", get(signals))
        .route("/api/filters", get(get_filters).put(put_filters))
        .route("/api/filters/reset", post(reset_filters))
        .route("/api/sync", post(force_sync))
        .route("/api/load-more", post(load_more))
        .route("/api/export", get(export))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Gateway failures surface as 502 with a small JSON body.
struct ApiError(FeedError);

impl From<FeedError> for ApiError {
    fn from(err: FeedError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
            kind: self.0.kind(),
        };
        (StatusCode::BAD_GATEWAY, Json(body)).into_response()
    }
}

async fn view(State(state): State<AppState>) -> Json<FeedView> {
    Json(state.engine.view())
}

async fn events(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.engine.events().as_ref().clone())
}

async fn signals(State(state): State<AppState>) -> Json<SignalView> {
    Json(state.engine.signal_view())
}

async fn get_filters(State(state): State<AppState>) -> Json<FilterConfig> {
    Json(state.engine.filter())
}

async fn put_filters(
    State(state): State<AppState>,
    Json(cfg): Json<FilterConfig>,
) -> Json<FilterConfig> {
    state.engine.set_filter(cfg);
    Json(state.engine.filter())
}

async fn reset_filters(State(state): State<AppState>) -> Json<FilterConfig> {
    state.engine.reset_filters();
    Json(state.engine.filter())
}

async fn force_sync(State(state): State<AppState>) -> Json<TickReport> {
    Json(state.engine.refresh().await)
}

#[derive(Serialize)]
struct LoadMoreOut {
    result: PageOutcome,
    pagination: PaginationState,
}

async fn load_more(State(state): State<AppState>) -> Result<Json<LoadMoreOut>, ApiError> {
    let result = state.engine.load_more().await?;
    Ok(Json(LoadMoreOut {
        result,
        pagination: state.engine.synchronizer().pagination(),
    }))
}

async fn export(State(state): State<AppState>) -> Result<Response, ApiError> {
    let report = state.engine.export_report().await?;
    let disposition = format!("attachment; filename={}", report.filename);
    Ok((
        [
            (header::CONTENT_TYPE, report.content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        report.bytes,
    )
        .into_response())
}
