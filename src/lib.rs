//! store_cache - caching and reliability middleware for document stores
//!
//! Gives every store operation a uniform `{status, data}` result, optional
//! read-through caching under deterministic keys, explicit invalidation,
//! bounded-retry transactions and latency/hit-rate metrics, independent of
//! the store and cache backend in use.

pub mod api;
pub mod cache;
pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod metrics;
pub mod models;
pub mod store;
pub mod tasks;
pub mod transaction;

pub use api::{create_router, AppState};
pub use cache::{CacheAdapter, CacheOptions, InMemoryAdapter, InvalidationRequest};
pub use config::Config;
pub use context::Middleware;
pub use envelope::{Envelope, Logger, TracingLogger};
pub use error::{ErrorKind, MiddlewareError, Result};
pub use store::{DocumentStore, Operations, QueryArgs};
pub use tasks::spawn_cleanup_task;
pub use transaction::TransactionOptions;
