//! Stable Serializer Module
//!
//! Canonical, insertion-order independent string form of structured values.
//! Only used to derive cache keys, never to persist data.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Number, Value};

use crate::error::{MiddlewareError, Result};

/// Token emitted in place of a reference that points back to an ancestor.
pub const CIRCULAR_TOKEN: &str = "[Circular]";

// == Stable Value ==
/// Input model for the serializer.
///
/// Covers what a JSON value covers plus the richer shapes callers put in
/// filters and options: dates, sets, maps, byte buffers, big integers,
/// opaque callables and shared (possibly cyclic) nodes.
#[derive(Debug, Clone)]
pub enum StableValue {
    Null,
    Bool(bool),
    Int(i64),
    /// Unsigned integers beyond `i64::MAX`; rendered as plain numbers
    UInt(u64),
    Float(f64),
    BigInt(i128),
    String(String),
    Bytes(Vec<u8>),
    Date(DateTime<Utc>),
    Array(Vec<StableValue>),
    /// Key/value pairs in insertion order
    Object(Vec<(String, StableValue)>),
    Set(Vec<StableValue>),
    Map(Vec<(StableValue, StableValue)>),
    Function(String),
    Symbol(String),
    /// Shared node; the only way to build a reference cycle
    Shared(Arc<RwLock<StableValue>>),
}

impl StableValue {
    /// Builds an object from pairs, keeping the given order.
    pub fn object<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, StableValue)>,
    {
        StableValue::Object(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Wraps a value in a shared node and returns the handle, so callers can
    /// later point a child back at it.
    pub fn shared(value: StableValue) -> (Self, Arc<RwLock<StableValue>>) {
        let node = Arc::new(RwLock::new(value));
        (StableValue::Shared(node.clone()), node)
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StableValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<Value> for StableValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => StableValue::Null,
            Value::Bool(b) => StableValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    StableValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    StableValue::UInt(u)
                } else {
                    StableValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => StableValue::String(s),
            Value::Array(items) => {
                StableValue::Array(items.into_iter().map(StableValue::from).collect())
            }
            Value::Object(map) => StableValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, StableValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&Value> for StableValue {
    fn from(value: &Value) -> Self {
        StableValue::from(value.clone())
    }
}

impl From<&str> for StableValue {
    fn from(value: &str) -> Self {
        StableValue::String(value.to_string())
    }
}

impl From<String> for StableValue {
    fn from(value: String) -> Self {
        StableValue::String(value)
    }
}

impl From<i64> for StableValue {
    fn from(value: i64) -> Self {
        StableValue::Int(value)
    }
}

impl From<bool> for StableValue {
    fn from(value: bool) -> Self {
        StableValue::Bool(value)
    }
}

impl From<f64> for StableValue {
    fn from(value: f64) -> Self {
        StableValue::Float(value)
    }
}

impl From<DateTime<Utc>> for StableValue {
    fn from(value: DateTime<Utc>) -> Self {
        StableValue::Date(value)
    }
}

impl From<Vec<StableValue>> for StableValue {
    fn from(value: Vec<StableValue>) -> Self {
        StableValue::Array(value)
    }
}

// == Serialize ==
/// Serializes `value` into its canonical string form.
///
/// Two values that differ only in object key insertion order produce the
/// same string. Fails only when a shared node cannot be read.
pub fn serialize(value: &StableValue) -> Result<String> {
    let mut out = String::new();
    let mut ancestors = HashSet::new();
    write_value(value, &mut out, &mut ancestors)?;
    Ok(out)
}

fn write_value(
    value: &StableValue,
    out: &mut String,
    ancestors: &mut HashSet<usize>,
) -> Result<()> {
    match value {
        StableValue::Null => out.push_str("null"),
        StableValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        StableValue::Int(i) => out.push_str(&i.to_string()),
        StableValue::UInt(u) => out.push_str(&u.to_string()),
        StableValue::Float(f) => match Number::from_f64(*f) {
            Some(n) => out.push_str(&n.to_string()),
            None => out.push_str("null"),
        },
        StableValue::BigInt(i) => write_str(&format!("{}n", i), out),
        StableValue::String(s) => write_str(s, out),
        StableValue::Bytes(bytes) => write_str(&STANDARD.encode(bytes), out),
        StableValue::Date(dt) => write_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true), out),
        StableValue::Function(name) => write_str(&format!("[Function:{}]", or_anonymous(name)), out),
        StableValue::Symbol(name) => write_str(&format!("[Symbol:{}]", or_anonymous(name)), out),
        StableValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out, ancestors)?;
            }
            out.push(']');
        }
        StableValue::Object(pairs) => {
            let mut sorted: Vec<&(String, StableValue)> = pairs.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));

            out.push('{');
            for (i, (key, item)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_str(key, out);
                out.push(':');
                write_value(item, out, ancestors)?;
            }
            out.push('}');
        }
        StableValue::Set(items) => {
            let mut rendered = items
                .iter()
                .map(|item| render(item, ancestors))
                .collect::<Result<Vec<_>>>()?;
            rendered.sort();
            out.push('[');
            out.push_str(&rendered.join(","));
            out.push(']');
        }
        StableValue::Map(entries) => {
            let mut rendered = entries
                .iter()
                .map(|(k, v)| Ok((render(k, ancestors)?, render(v, ancestors)?)))
                .collect::<Result<Vec<_>>>()?;
            rendered.sort_by(|a, b| a.0.cmp(&b.0));
            out.push('[');
            for (i, (k, v)) in rendered.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push('[');
                out.push_str(&k);
                out.push(',');
                out.push_str(&v);
                out.push(']');
            }
            out.push(']');
        }
        StableValue::Shared(node) => {
            let id = Arc::as_ptr(node) as *const () as usize;
            if !ancestors.insert(id) {
                write_str(CIRCULAR_TOKEN, out);
                return Ok(());
            }
            let guard = node
                .read()
                .map_err(|_| MiddlewareError::Serialization("shared value lock poisoned".to_string()))?;
            let result = write_value(&guard, out, ancestors);
            drop(guard);
            ancestors.remove(&id);
            result?;
        }
    }
    Ok(())
}

fn render(value: &StableValue, ancestors: &mut HashSet<usize>) -> Result<String> {
    let mut out = String::new();
    write_value(value, &mut out, ancestors)?;
    Ok(out)
}

fn write_str(s: &str, out: &mut String) {
    // serde_json escapes exactly like a JSON string literal
    out.push_str(&Value::String(s.to_string()).to_string());
}

fn or_anonymous(name: &str) -> &str {
    if name.is_empty() {
        "anonymous"
    } else {
        name
    }
}
