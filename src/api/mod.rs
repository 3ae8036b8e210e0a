//! API Module
//!
//! Admin HTTP surface over the process-wide middleware context.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `GET /metrics` - Cache counters, per-operation latency and hit rate
//! - `DELETE /metrics` - Reset metrics
//! - `POST /invalidate` - Invalidate cache keys and prefixes

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
