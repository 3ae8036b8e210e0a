//! Envelope Module
//!
//! The uniform `{status, data}` result returned by every public operation,
//! plus the logger sink notified whenever a failure envelope is built.

mod logger;
mod result;

pub use logger::{Logger, NoopLogger, TracingLogger};
pub use result::{fail, safe_query, Envelope, IntoEnvelope};

pub(crate) use result::normalize;
