//! Cache Entry Module
//!
//! A stored envelope with millisecond TTL metadata.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::envelope::Envelope;

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored envelope
    pub value: Envelope,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry living `ttl_ms` milliseconds. A TTL of zero means
    /// the entry never expires.
    pub fn new(value: Envelope, ttl_ms: u64) -> Self {
        let now = current_timestamp_ms();
        let expires_at = if ttl_ms == 0 {
            None
        } else {
            Some(now.saturating_add(ttl_ms))
        };

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// An entry is expired once the current time reaches its expiration time.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Force Expiry ==
    /// Marks the entry as expired right now.
    pub fn expire(&mut self) {
        self.expires_at = Some(current_timestamp_ms());
    }

    // == Time To Live ==
    /// Remaining TTL in milliseconds, `Some(0)` once elapsed, `None` if the
    /// entry never expires.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at
            .map(|expires| expires.saturating_sub(current_timestamp_ms()))
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
