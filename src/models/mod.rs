//! Wire models
//!
//! The write-argument record consumed by write operations and the response
//! bodies of the admin API.

pub mod responses;
pub mod write_args;

// Re-export commonly used types
pub use responses::{HealthResponse, MetricsResponse};
pub use write_args::{parse_write_arg, KeySpec, WriteDirectives, RECOGNIZED_OPTION_KEYS};
