//! Cache Key Builder Module
//!
//! Derives deterministic keys of the form `{op}:{entity}:{hash}`.

use super::hash::hash;
use super::serializer::{serialize, StableValue};
use crate::error::{MiddlewareError, Result};

/// Builds the cache key for `op` called with `args`.
///
/// `args[0]` must be the entity identifier as a string; the remaining
/// arguments are serialized canonically and hashed.
pub fn build_key(op: &str, args: &[StableValue]) -> Result<String> {
    let entity = args
        .first()
        .and_then(StableValue::as_str)
        .ok_or_else(|| {
            MiddlewareError::Validation(format!(
                "cache key for '{}' requires a string entity identifier as the first argument",
                op
            ))
        })?;

    let rest = StableValue::Array(args[1..].to_vec());
    let digest = hash(&serialize(&rest)?);

    Ok(format!("{}:{}:{}", op, entity, digest))
}
