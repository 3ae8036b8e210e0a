//! Invalidation Engine Module
//!
//! Removes cache entries by exact key and by key prefix.

use std::collections::HashSet;

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::CacheAdapter;
use crate::envelope::{fail, Envelope, Logger};
use crate::error::{MiddlewareError, Result};
use crate::metrics::MetricsRecorder;
use crate::models::{KeySpec, WriteDirectives};

// == Invalidation Request ==
/// Exact keys and key prefixes to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationRequest {
    pub keys: Vec<String>,
    pub prefixes: Vec<String>,
}

impl InvalidationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn with_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefixes.extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.prefixes.is_empty()
    }

    /// Reads a string, an array of strings, or `{keys?, prefixes?}` where
    /// each field is a string or an array of strings. `null` is an empty
    /// request.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::String(_) | Value::Array(_) => Ok(Self {
                keys: string_list(value, "keys")?,
                prefixes: Vec::new(),
            }),
            Value::Object(map) => {
                let field = |name: &str| match map.get(name) {
                    None | Some(Value::Null) => Ok(Vec::new()),
                    Some(v) => string_list(v, name),
                };
                Ok(Self {
                    keys: field("keys")?,
                    prefixes: field("prefixes")?,
                })
            }
            other => Err(MiddlewareError::Validation(format!(
                "invalidation input must be a string, a list of strings or {{keys, prefixes}}, got {}",
                other
            ))),
        }
    }
}

fn string_list(value: &Value, field: &str) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    MiddlewareError::Validation(format!("{} must contain only strings", field))
                })
            })
            .collect(),
        _ => Err(MiddlewareError::Validation(format!(
            "{} must be a string or a list of strings",
            field
        ))),
    }
}

impl From<&str> for InvalidationRequest {
    fn from(key: &str) -> Self {
        Self::new().with_keys([key])
    }
}

impl From<String> for InvalidationRequest {
    fn from(key: String) -> Self {
        Self::new().with_keys([key])
    }
}

impl From<Vec<String>> for InvalidationRequest {
    fn from(keys: Vec<String>) -> Self {
        Self::new().with_keys(keys)
    }
}

impl From<Vec<&str>> for InvalidationRequest {
    fn from(keys: Vec<&str>) -> Self {
        Self::new().with_keys(keys)
    }
}

impl From<&WriteDirectives> for InvalidationRequest {
    fn from(directives: &WriteDirectives) -> Self {
        let list = |spec: &Option<KeySpec>| spec.as_ref().map(KeySpec::to_vec).unwrap_or_default();
        Self {
            keys: list(&directives.invalidate_keys),
            prefixes: list(&directives.invalidate_prefixes),
        }
    }
}

// == Invalidate ==
/// Deletes the requested keys and every key under the requested prefixes.
///
/// Prefixes are matched against one enumeration of the adapter's keys taken
/// before anything is deleted. Exact keys are de-duplicated; a failed delete
/// is logged and skipped. The returned count adds both passes, so a key
/// named exactly and also under a prefix is counted twice.
pub async fn invalidate(
    adapter: &dyn CacheAdapter,
    metrics: &MetricsRecorder,
    logger: &dyn Logger,
    request: InvalidationRequest,
) -> Envelope {
    let snapshot = if request.prefixes.is_empty() {
        Vec::new()
    } else {
        match adapter.keys().await {
            Ok(keys) => keys,
            Err(err) => return fail(logger, err, "invalidate"),
        }
    };

    let mut count: u64 = 0;

    let unique: HashSet<&str> = request.keys.iter().map(String::as_str).collect();
    for key in unique {
        match adapter.del(key).await {
            Ok(()) => count += 1,
            Err(err) => warn!(key, error = %err, "invalidation of key failed"),
        }
    }

    for prefix in &request.prefixes {
        for key in snapshot.iter().filter(|k| k.starts_with(prefix.as_str())) {
            match adapter.del(key).await {
                Ok(()) => count += 1,
                Err(err) => warn!(key = %key, error = %err, "invalidation of key failed"),
            }
        }
    }

    metrics.record_invalidations(count);
    debug!(count, "cache invalidated");
    Envelope::ok(json!({ "invalidated": count }))
}
