//! Cache Module
//!
//! Adapter capability set, read-through orchestration and invalidation.

mod adapter;
mod entry;
mod invalidation;
mod memory;
mod orchestrator;


// Re-export public types
pub use adapter::{CacheAdapter, NoopAdapter};
pub use entry::{current_timestamp_ms, CacheEntry};
pub use invalidation::{invalidate, InvalidationRequest};
pub use memory::InMemoryAdapter;
pub use orchestrator::{CacheOptions, CacheOrchestrator, CachePredicate};
