//! Logger sink for failure envelopes.

use tracing::error;

use crate::error::MiddlewareError;

/// Receives every error folded into a failure envelope, together with a
/// context label naming the operation that failed.
pub trait Logger: Send + Sync {
    fn log(&self, error: &MiddlewareError, context: &str);
}

/// Discards everything. Used when no logger has been configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _error: &MiddlewareError, _context: &str) {}
}

/// Forwards failures to `tracing` at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, err: &MiddlewareError, context: &str) {
        error!(kind = ?err.kind(), context, "{}", err);
    }
}

impl<F> Logger for F
where
    F: Fn(&MiddlewareError, &str) + Send + Sync,
{
    fn log(&self, error: &MiddlewareError, context: &str) {
        self(error, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_logger_receives_context() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let logger = move |err: &MiddlewareError, ctx: &str| {
            sink.lock().unwrap().push(format!("{}|{}", ctx, err));
        };

        logger.log(&MiddlewareError::Store("down".to_string()), "getOne");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].starts_with("getOne|"));
    }

    #[test]
    fn test_noop_logger_is_silent() {
        NoopLogger.log(&MiddlewareError::Internal("x".to_string()), "ctx");
    }
}
