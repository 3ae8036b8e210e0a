//! Argument normalization for store operations.
//!
//! Reads accept either positional arguments `[entity, filter, options]` or a
//! single named object `{entity, filter, options}`. Both are resolved once
//! here, so the operations themselves only see typed arguments.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Filter;
use crate::cache::CacheOptions;
use crate::error::{MiddlewareError, Result};
use crate::keys::StableValue;

// == Find Options ==
/// Query shaping passed through to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FindOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

// == Query Args ==
/// Arguments of `getOne`, `getMany` and `count`.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    pub entity: String,
    pub filter: Filter,
    pub find: FindOptions,
    /// Absent means the read is not cached
    pub cache: Option<CacheOptions>,
}

impl QueryArgs {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            filter: Map::new(),
            find: FindOptions::default(),
            cache: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_find(mut self, find: FindOptions) -> Self {
        self.find = find;
        self
    }

    pub fn with_cache(mut self, cache: CacheOptions) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Normalizes positional or named arguments.
    pub fn parse(args: &[Value]) -> Result<Self> {
        let (entity, filter, options) = positional_or_named(args, "filter");

        let entity = entity_arg(entity)?;
        let filter = object_arg(filter, "filter")?;
        let (find, cache) = match options {
            None | Some(Value::Null) => (FindOptions::default(), None),
            Some(Value::Object(map)) => {
                let find = serde_json::from_value(Value::Object(map.clone()))
                    .map_err(|e| MiddlewareError::Validation(format!("invalid options: {}", e)))?;
                (find, map.get("cache").and_then(CacheOptions::from_value))
            }
            Some(_) => {
                return Err(MiddlewareError::Validation(
                    "options must be an object".to_string(),
                ))
            }
        };

        Ok(Self {
            entity,
            filter,
            find,
            cache,
        })
    }

    /// Arguments the cache key is derived from.
    pub fn key_args(&self) -> Vec<StableValue> {
        let find = serde_json::to_value(&self.find).unwrap_or(Value::Null);
        vec![
            self.entity.as_str().into(),
            Value::Object(self.filter.clone()).into(),
            find.into(),
        ]
    }
}

// == Aggregate Args ==
/// Arguments of `aggregate`: `[entity, pipeline, options]` or
/// `{entity, pipeline, options}`.
#[derive(Debug, Clone)]
pub struct AggregateArgs {
    pub entity: String,
    pub pipeline: Vec<Value>,
    pub cache: Option<CacheOptions>,
}

impl AggregateArgs {
    pub fn new(entity: impl Into<String>, pipeline: Vec<Value>) -> Self {
        Self {
            entity: entity.into(),
            pipeline,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: CacheOptions) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn parse(args: &[Value]) -> Result<Self> {
        let (entity, pipeline, options) = positional_or_named(args, "pipeline");

        let entity = entity_arg(entity)?;
        let pipeline = match pipeline {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(stages)) if stages.iter().all(Value::is_object) => stages.clone(),
            Some(_) => {
                return Err(MiddlewareError::Validation(
                    "pipeline must be a list of stage objects".to_string(),
                ))
            }
        };
        let cache = match options {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => map.get("cache").and_then(CacheOptions::from_value),
            Some(_) => {
                return Err(MiddlewareError::Validation(
                    "options must be an object".to_string(),
                ))
            }
        };

        Ok(Self {
            entity,
            pipeline,
            cache,
        })
    }

    pub fn key_args(&self) -> Vec<StableValue> {
        vec![
            self.entity.as_str().into(),
            Value::Array(self.pipeline.clone()).into(),
        ]
    }
}

// == Helpers ==
fn positional_or_named<'a>(
    args: &'a [Value],
    second: &str,
) -> (Option<&'a Value>, Option<&'a Value>, Option<&'a Value>) {
    match args {
        [Value::Object(named)] if named.contains_key("entity") => (
            named.get("entity"),
            named.get(second),
            named.get("options"),
        ),
        _ => (args.first(), args.get(1), args.get(2)),
    }
}

/// Entity identifiers must be non-empty strings.
pub(crate) fn entity_arg(value: Option<&Value>) -> Result<String> {
    match value {
        Some(Value::String(entity)) if !entity.is_empty() => Ok(entity.clone()),
        _ => Err(MiddlewareError::Validation(
            "entity must be a non-empty string".to_string(),
        )),
    }
}

/// Objects, with `null` or absence read as `{}`.
pub(crate) fn object_arg(value: Option<&Value>, name: &str) -> Result<Map<String, Value>> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(MiddlewareError::Validation(format!(
            "{} must be an object",
            name
        ))),
    }
}

/// Objects only. Writes must name their target, so `null` is rejected;
/// `{}` still matches every document.
pub(crate) fn required_object_arg(value: &Value, name: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Err(MiddlewareError::Validation(format!("{} is required", name))),
        _ => Err(MiddlewareError::Validation(format!(
            "{} must be an object",
            name
        ))),
    }
}
