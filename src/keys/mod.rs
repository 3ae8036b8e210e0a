//! Keys Module
//!
//! Canonical serialization, hashing, cache key derivation and TTL parsing.

mod builder;
mod hash;
mod serializer;
mod ttl;


pub use builder::build_key;
pub use hash::hash;
pub use serializer::{serialize, StableValue, CIRCULAR_TOKEN};
pub use ttl::{normalize_ttl, normalize_ttl_value, Ttl, DEFAULT_TTL_MS};
