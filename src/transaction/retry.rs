//! Transaction Retry Orchestrator
//!
//! Idle -> Attempting -> Committed | Retrying | Failed. Every attempt reruns
//! the whole body on a fresh transaction of the same session.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{SessionProvider, TransactionOptions, TransactionScope};
use crate::envelope::{fail, Envelope, Logger};
use crate::error::{MiddlewareError, Result};
use crate::metrics::MetricsRecorder;

/// Attempts allowed regardless of `max_commit_retries`.
pub const MAX_TRANSACTION_ATTEMPTS: u32 = 10;

/// Wall-clock budget from the first attempt; no retry starts after it.
pub const TRANSACTION_DEADLINE: Duration = Duration::from_millis(30_000);

/// Latency bucket for transactions.
pub const TRANSACTION_METRIC: &str = "transaction:session";

// == With Transaction ==
/// Runs `work` inside a transaction, retrying failed attempts.
///
/// A failed attempt is retried while fewer than `max_commit_retries`
/// retries have been used. Independently, the loop stops with
/// `RetryLimitExceeded` after [`MAX_TRANSACTION_ATTEMPTS`] attempts or once
/// [`TRANSACTION_DEADLINE`] has elapsed. The session is always ended.
pub async fn with_transaction<P, F, Fut>(
    provider: &P,
    metrics: &MetricsRecorder,
    logger: &dyn Logger,
    options: &TransactionOptions,
    mut work: F,
) -> Envelope
where
    P: SessionProvider + ?Sized,
    F: FnMut(Arc<dyn TransactionScope>) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let started = std::time::Instant::now();

    let outcome = match provider.start_session().await {
        Ok(scope) => {
            let outcome = retry_loop(&scope, options, &mut work).await;
            scope.end().await;
            outcome
        }
        Err(err) => Err(err),
    };

    metrics.record_timing(TRANSACTION_METRIC, started);

    match outcome {
        Ok(value) => Envelope::ok(value),
        Err(err) => fail(logger, err, "withTransaction"),
    }
}

async fn retry_loop<F, Fut>(
    scope: &Arc<dyn TransactionScope>,
    options: &TransactionOptions,
    work: &mut F,
) -> Result<Value>
where
    F: FnMut(Arc<dyn TransactionScope>) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    let loop_start = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let err = match run_attempt(scope, options, work).await {
            Ok(value) => {
                debug!(session = %scope.id(), attempt, "transaction committed");
                return Ok(value);
            }
            Err(err) => err,
        };

        if attempt - 1 >= options.max_commit_retries {
            return Err(err);
        }

        let elapsed = loop_start.elapsed();
        if attempt >= MAX_TRANSACTION_ATTEMPTS || elapsed >= TRANSACTION_DEADLINE {
            return Err(MiddlewareError::RetryLimitExceeded {
                attempts: attempt,
                elapsed_ms: elapsed.as_millis() as u64,
                last_error: err.to_string(),
            });
        }

        warn!(session = %scope.id(), attempt, error = %err, "transaction attempt failed, retrying");
    }
}

async fn run_attempt<F, Fut>(
    scope: &Arc<dyn TransactionScope>,
    options: &TransactionOptions,
    work: &mut F,
) -> Result<Value>
where
    F: FnMut(Arc<dyn TransactionScope>) -> Fut,
    Fut: Future<Output = Result<Value>>,
{
    scope.start_transaction(options).await?;

    let value = match work(scope.clone()).await {
        Ok(value) => value,
        Err(err) => {
            abort_quietly(scope.as_ref()).await;
            return Err(err);
        }
    };

    if let Err(err) = scope.commit().await {
        abort_quietly(scope.as_ref()).await;
        return Err(MiddlewareError::Transaction(format!("commit failed: {}", err)));
    }

    Ok(value)
}

async fn abort_quietly(scope: &dyn TransactionScope) {
    if let Err(err) = scope.abort().await {
        warn!(session = %scope.id(), error = %err, "transaction abort failed");
    }
}
