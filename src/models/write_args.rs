//! Write argument parsing
//!
//! Write operations accept one flexible trailing argument that may carry
//! store options, cache keys to invalidate, key prefixes to invalidate, or a
//! mix. This module resolves it by shape into one canonical record.

use serde::Serialize;
use serde_json::{Map, Value};

/// Top-level keys that mark an object as a bare options record.
pub const RECOGNIZED_OPTION_KEYS: [&str; 4] = ["session", "upsert", "writeConcern", "runValidators"];

const INVALIDATE_KEYS: &str = "invalidateKeys";
const INVALIDATE_PREFIXES: &str = "invalidatePrefixes";

// == Key Spec ==
/// One key or a list of keys, kept in the shape the caller used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum KeySpec {
    One(String),
    Many(Vec<String>),
}

impl KeySpec {
    /// Reads a string or an array of strings. Non-string array items are
    /// dropped; any other shape yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(key) => Some(KeySpec::One(key.clone())),
            Value::Array(items) => Some(KeySpec::Many(
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            )),
            _ => None,
        }
    }

    pub fn to_vec(&self) -> Vec<String> {
        match self {
            KeySpec::One(key) => vec![key.clone()],
            KeySpec::Many(keys) => keys.clone(),
        }
    }
}

// == Write Directives ==
/// Canonical form of a write argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteDirectives {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidate_keys: Option<KeySpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidate_prefixes: Option<KeySpec>,
}

impl WriteDirectives {
    /// True when the write should trigger cache invalidation.
    pub fn has_invalidation(&self) -> bool {
        self.invalidate_keys.is_some() || self.invalidate_prefixes.is_some()
    }
}

// == Parse ==
/// Resolves a write argument by shape.
///
/// - absent / `null`: nothing
/// - string or array: keys to invalidate
/// - object: `invalidateKeys` / `invalidatePrefixes` are always extracted;
///   a nested `options` object becomes the options record, otherwise an
///   object carrying any recognized option key is itself the options record
///   (minus the two invalidation fields)
/// - anything else: nothing
pub fn parse_write_arg(arg: Option<&Value>) -> WriteDirectives {
    let value = match arg {
        Some(value) => value,
        None => return WriteDirectives::default(),
    };

    match value {
        Value::String(_) | Value::Array(_) => WriteDirectives {
            invalidate_keys: KeySpec::from_value(value),
            ..WriteDirectives::default()
        },
        Value::Object(map) => {
            let options = match map.get("options") {
                Some(Value::Object(nested)) => Some(nested.clone()),
                _ if RECOGNIZED_OPTION_KEYS.iter().any(|k| map.contains_key(*k)) => {
                    let mut direct = map.clone();
                    direct.remove(INVALIDATE_KEYS);
                    direct.remove(INVALIDATE_PREFIXES);
                    Some(direct)
                }
                _ => None,
            };

            WriteDirectives {
                options,
                invalidate_keys: map.get(INVALIDATE_KEYS).and_then(KeySpec::from_value),
                invalidate_prefixes: map.get(INVALIDATE_PREFIXES).and_then(KeySpec::from_value),
            }
        }
        _ => WriteDirectives::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parsed(arg: Value) -> Value {
        serde_json::to_value(parse_write_arg(Some(&arg))).unwrap()
    }

    #[test]
    fn test_absent() {
        assert_eq!(parse_write_arg(None), WriteDirectives::default());
        assert_eq!(parse_write_arg(Some(&Value::Null)), WriteDirectives::default());
        assert_eq!(parse_write_arg(Some(&json!(5))), WriteDirectives::default());
    }

    #[test]
    fn test_string_and_list() {
        assert_eq!(parsed(json!("k")), json!({"invalidateKeys": "k"}));
        assert_eq!(
            parsed(json!(["k1", "k2"])),
            json!({"invalidateKeys": ["k1", "k2"]})
        );
    }

    #[test]
    fn test_direct_options() {
        assert_eq!(
            parsed(json!({"session": "S"})),
            json!({"options": {"session": "S"}})
        );
        assert_eq!(
            parsed(json!({"upsert": true, "writeConcern": {"w": 1}})),
            json!({"options": {"upsert": true, "writeConcern": {"w": 1}}})
        );
    }

    #[test]
    fn test_combined() {
        assert_eq!(
            parsed(json!({"options": {"session": "S"}, "invalidatePrefixes": "p:"})),
            json!({"options": {"session": "S"}, "invalidatePrefixes": "p:"})
        );
    }

    #[test]
    fn test_nested_options_win_over_flat_keys() {
        assert_eq!(
            parsed(json!({"options": {"upsert": true}, "session": "S"})),
            json!({"options": {"upsert": true}})
        );
    }

    #[test]
    fn test_flat_keys_strip_invalidation_fields() {
        assert_eq!(
            parsed(json!({"session": "S", "invalidateKeys": ["a"], "invalidatePrefixes": "p:"})),
            json!({
                "options": {"session": "S"},
                "invalidateKeys": ["a"],
                "invalidatePrefixes": "p:"
            })
        );
    }

    #[test]
    fn test_unrecognized_object_has_no_options() {
        let directives = parse_write_arg(Some(&json!({"foo": 1, "invalidateKeys": "a"})));
        assert!(directives.options.is_none());
        assert_eq!(directives.invalidate_keys, Some(KeySpec::One("a".to_string())));
        assert!(directives.has_invalidation());
    }

    #[test]
    fn test_key_spec_to_vec() {
        assert_eq!(KeySpec::One("a".to_string()).to_vec(), vec!["a"]);
        assert_eq!(
            KeySpec::from_value(&json!(["a", 1, "b"])).unwrap().to_vec(),
            vec!["a", "b"]
        );
    }
}
