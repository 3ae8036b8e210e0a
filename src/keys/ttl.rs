//! TTL Normalizer Module
//!
//! Turns loosely-typed TTL input into integer milliseconds. Never fails.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fallback for anything that is not a finite number or a valid TTL string.
pub const DEFAULT_TTL_MS: u64 = 60_000;

/// `<digits><unit?>`, unit one of ms|s|m|h|d, case-insensitive.
static TTL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+)(ms|s|m|h|d)?$").expect("valid TTL pattern"));

// == TTL Input ==
/// A TTL as callers express it: a number of milliseconds or a string such
/// as `"500ms"`, `"5m"` or `"2d"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ttl {
    Millis(f64),
    Text(String),
}

impl Default for Ttl {
    fn default() -> Self {
        Ttl::Millis(DEFAULT_TTL_MS as f64)
    }
}

impl From<u64> for Ttl {
    fn from(ms: u64) -> Self {
        Ttl::Millis(ms as f64)
    }
}

impl From<i64> for Ttl {
    fn from(ms: i64) -> Self {
        Ttl::Millis(ms as f64)
    }
}

impl From<f64> for Ttl {
    fn from(ms: f64) -> Self {
        Ttl::Millis(ms)
    }
}

impl From<&str> for Ttl {
    fn from(text: &str) -> Self {
        Ttl::Text(text.to_string())
    }
}

impl From<String> for Ttl {
    fn from(text: String) -> Self {
        Ttl::Text(text)
    }
}

impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        Ttl::Millis(duration.as_millis() as f64)
    }
}

// == Normalize ==
/// Normalizes a TTL to milliseconds.
///
/// Finite numbers are floored and clamped at 0. Strings must match the TTL
/// grammar. Everything else, including `None`, yields [`DEFAULT_TTL_MS`].
pub fn normalize_ttl(ttl: Option<&Ttl>) -> u64 {
    match ttl {
        Some(Ttl::Millis(ms)) => normalize_number(*ms),
        Some(Ttl::Text(text)) => parse_ttl_str(text).unwrap_or(DEFAULT_TTL_MS),
        None => DEFAULT_TTL_MS,
    }
}

/// Normalizes a TTL given as an arbitrary JSON value.
pub fn normalize_ttl_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_f64().map(normalize_number).unwrap_or(DEFAULT_TTL_MS),
        Value::String(text) => parse_ttl_str(text).unwrap_or(DEFAULT_TTL_MS),
        _ => DEFAULT_TTL_MS,
    }
}

fn normalize_number(ms: f64) -> u64 {
    if !ms.is_finite() {
        return DEFAULT_TTL_MS;
    }
    if ms <= 0.0 {
        0
    } else {
        ms.floor() as u64
    }
}

fn parse_ttl_str(text: &str) -> Option<u64> {
    let caps = TTL_PATTERN.captures(text)?;
    // The pattern admits digits only, so a parse failure is overflow.
    let amount: u64 = caps.get(1)?.as_str().parse().unwrap_or(u64::MAX);
    let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
        None => 1,
        Some(unit) => match unit.as_str() {
            "ms" => 1,
            "s" => 1_000,
            "m" => 60_000,
            "h" => 3_600_000,
            "d" => 86_400_000,
            _ => return None,
        },
    };
    Some(amount.saturating_mul(multiplier))
}
