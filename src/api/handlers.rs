//! API Handlers
//!
//! HTTP request handlers for the admin endpoints.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use crate::cache::{InMemoryAdapter, InvalidationRequest};
use crate::config::Config;
use crate::context::Middleware;
use crate::envelope::Envelope;
use crate::error::Result;
use crate::models::{HealthResponse, MetricsResponse};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub middleware: Middleware,
    /// The backend installed in `middleware`, kept typed for sweeping and
    /// adapter figures
    pub adapter: Arc<InMemoryAdapter>,
}

impl AppState {
    /// Installs `adapter` as the cache of `middleware`.
    pub fn new(middleware: Middleware, adapter: Arc<InMemoryAdapter>) -> Self {
        middleware.configure_cache(Some(adapter.clone()));
        Self {
            middleware,
            adapter,
        }
    }

    /// Sizes the in-memory adapter from the configuration.
    pub fn from_config(config: &Config, middleware: Middleware) -> Self {
        Self::new(
            middleware,
            Arc::new(InMemoryAdapter::new(config.max_entries)),
        )
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse::new(
        state.middleware.metrics_snapshot(),
        state.adapter.len(),
        state.adapter.evictions(),
    ))
}

/// Handler for DELETE /metrics
pub async fn reset_metrics_handler(State(state): State<AppState>) -> StatusCode {
    state.middleware.reset_metrics();
    StatusCode::NO_CONTENT
}

/// Handler for POST /invalidate
///
/// Accepts a key, a list of keys or `{keys, prefixes}`. Malformed input is
/// rejected with 400 before anything is removed.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Envelope>> {
    let request = InvalidationRequest::from_value(&body)?;
    Ok(Json(state.middleware.invalidate(request).await))
}
