//! Result envelope and normalization of operation outputs.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Logger;
use crate::error::{ErrorKind, MiddlewareError, Result};

// == Envelope ==
/// Uniform result of every public operation.
///
/// `status == true` means `data` is the payload; `status == false` means
/// `data` is the error record (`{"kind", "message"}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: bool,
    pub data: Value,
}

impl Envelope {
    /// Wraps a payload as a success envelope.
    pub fn ok(data: impl Into<Value>) -> Self {
        Self {
            status: true,
            data: data.into(),
        }
    }

    /// Builds a failure envelope without notifying any logger.
    ///
    /// Prefer [`fail`] on public paths so the logger sees the error.
    pub fn from_error(err: &MiddlewareError) -> Self {
        Self {
            status: false,
            data: err.to_value(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status
    }

    /// Error kind carried by a failure envelope, if any.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        if self.status {
            return None;
        }
        self.data
            .get("kind")
            .and_then(|kind| serde_json::from_value(kind.clone()).ok())
    }

    /// Error message carried by a failure envelope, if any.
    pub fn error_message(&self) -> Option<&str> {
        if self.status {
            return None;
        }
        self.data.get("message").and_then(Value::as_str)
    }
}

// == Fail ==
/// Notifies the logger synchronously, then returns the failure envelope.
pub fn fail(logger: &dyn Logger, err: MiddlewareError, context: &str) -> Envelope {
    logger.log(&err, context);
    Envelope::from_error(&err)
}

// == Normalization ==
/// Anything a producer may hand back: an envelope already, a bare value, or
/// a `Result` whose error becomes a failure envelope.
pub trait IntoEnvelope {
    fn into_envelope(self) -> Result<Envelope>;
}

impl IntoEnvelope for Envelope {
    fn into_envelope(self) -> Result<Envelope> {
        Ok(self)
    }
}

impl IntoEnvelope for Value {
    fn into_envelope(self) -> Result<Envelope> {
        Ok(Envelope::ok(self))
    }
}

impl<T, E> IntoEnvelope for std::result::Result<T, E>
where
    T: Serialize,
    E: Into<MiddlewareError>,
{
    fn into_envelope(self) -> Result<Envelope> {
        let payload = self.map_err(Into::into)?;
        let data = serde_json::to_value(payload)
            .map_err(|e| MiddlewareError::Serialization(e.to_string()))?;
        Ok(Envelope::ok(data))
    }
}

/// Turns any producer output into an envelope, logging failures.
pub(crate) fn normalize<R: IntoEnvelope>(logger: &dyn Logger, output: R, context: &str) -> Envelope {
    match output.into_envelope() {
        Ok(envelope) => envelope,
        Err(err) => fail(logger, err, context),
    }
}

// == Safe Query ==
/// Runs `work` and guarantees an envelope, even if it panics or returns a
/// bare value.
pub async fn safe_query<F, R>(logger: &dyn Logger, context: &str, work: F) -> Envelope
where
    F: Future<Output = R>,
    R: IntoEnvelope,
{
    match AssertUnwindSafe(work).catch_unwind().await {
        Ok(output) => normalize(logger, output, context),
        Err(panic) => fail(
            logger,
            MiddlewareError::Internal(panic_message(panic.as_ref())),
            context,
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "operation panicked".to_string()
    }
}
