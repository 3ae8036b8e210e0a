//! Collaborator traits for the document store and entity resolution.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::FindOptions;
use crate::error::{MiddlewareError, Result};
use crate::transaction::SessionProvider;

/// Filter documents are plain JSON objects.
pub type Filter = Map<String, Value>;

// == Document Store ==
/// Query, write and aggregate primitives of the backing store. Semantics of
/// each call belong to the store; this layer only sequences them.
#[async_trait]
pub trait DocumentStore: SessionProvider {
    /// First matching document, or `null` when nothing matches.
    async fn find_one(&self, collection: &str, filter: &Filter, options: &FindOptions)
        -> Result<Value>;

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<Value>>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;

    async fn insert(
        &self,
        collection: &str,
        documents: Vec<Value>,
        options: Option<&Map<String, Value>>,
    ) -> Result<Value>;

    async fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Map<String, Value>,
        options: Option<&Map<String, Value>>,
    ) -> Result<Value>;

    async fn delete(
        &self,
        collection: &str,
        filter: &Filter,
        options: Option<&Map<String, Value>>,
    ) -> Result<Value>;

    async fn aggregate(&self, collection: &str, pipeline: &[Value]) -> Result<Vec<Value>>;
}

// == Entity Resolution ==
/// Maps a caller-facing entity identifier to the store collection.
pub trait EntityResolver: Send + Sync {
    fn resolve(&self, entity: &str) -> Result<String>;
}

/// Uses the entity identifier as the collection name.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

impl EntityResolver for PassthroughResolver {
    fn resolve(&self, entity: &str) -> Result<String> {
        Ok(entity.to_string())
    }
}

/// Fixed registry of known entities. Unknown names fail with `Resolution`.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: HashMap<String, String>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, entity: impl Into<String>, collection: impl Into<String>) -> Self {
        self.entries.insert(entity.into(), collection.into());
        self
    }
}

impl EntityResolver for StaticResolver {
    fn resolve(&self, entity: &str) -> Result<String> {
        self.entries
            .get(entity)
            .cloned()
            .ok_or_else(|| MiddlewareError::Resolution(format!("unknown entity: {}", entity)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passthrough() {
        assert_eq!(PassthroughResolver.resolve("users").unwrap(), "users");
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticResolver::new().register("User", "users");
        assert_eq!(resolver.resolve("User").unwrap(), "users");
        assert_eq!(
            resolver.resolve("Order"),
            Err(MiddlewareError::Resolution("unknown entity: Order".to_string()))
        );
    }
}
