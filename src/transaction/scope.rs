//! Session and transaction primitives provided by the document store.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

// == Transaction Options ==
/// Options passed through to the store's transaction primitive, plus the
/// caller's retry budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionOptions {
    pub read_concern: Option<String>,
    pub write_concern: Option<Value>,
    pub read_preference: Option<Value>,
    /// Retries after the first failed attempt (0 = single attempt)
    pub max_commit_retries: u32,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_commit_retries(mut self, retries: u32) -> Self {
        self.max_commit_retries = retries;
        self
    }

    pub fn with_read_concern(mut self, level: impl Into<String>) -> Self {
        self.read_concern = Some(level.into());
        self
    }

    pub fn with_write_concern(mut self, concern: Value) -> Self {
        self.write_concern = Some(concern);
        self
    }

    pub fn with_read_preference(mut self, preference: Value) -> Self {
        self.read_preference = Some(preference);
        self
    }
}

// == Transaction Scope ==
/// One store session able to run successive transactions.
#[async_trait]
pub trait TransactionScope: Send + Sync {
    /// Opaque session identifier, usable as the `session` write option.
    fn id(&self) -> String;

    async fn start_transaction(&self, options: &TransactionOptions) -> Result<()>;

    async fn commit(&self) -> Result<()>;

    async fn abort(&self) -> Result<()>;

    /// Releases the session. Called exactly once, whatever the outcome.
    async fn end(&self);
}

/// Opens sessions. Implemented by document stores.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn start_session(&self) -> Result<Arc<dyn TransactionScope>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: TransactionOptions = serde_json::from_value(json!({
            "readConcern": "snapshot",
            "writeConcern": {"w": "majority"},
            "maxCommitRetries": 3
        }))
        .unwrap();

        assert_eq!(options.read_concern.as_deref(), Some("snapshot"));
        assert_eq!(options.write_concern, Some(json!({"w": "majority"})));
        assert!(options.read_preference.is_none());
        assert_eq!(options.max_commit_retries, 3);
    }

    #[test]
    fn test_default_is_single_attempt() {
        assert_eq!(TransactionOptions::new().max_commit_retries, 0);
    }
}
