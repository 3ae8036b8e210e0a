//! Middleware Context
//!
//! The single configuration point: which cache adapter and logger are in
//! use, and the metrics every timed path records into. One process-wide
//! instance is available through [`Middleware::global`]; tests build their
//! own with [`Middleware::new`].

use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;
use serde_json::Value;
use tracing::info;

use crate::cache::{invalidate, CacheAdapter, CacheOptions, CacheOrchestrator, InvalidationRequest, NoopAdapter};
use crate::envelope::{self, Envelope, IntoEnvelope, Logger, NoopLogger};
use crate::error::{MiddlewareError, Result};
use crate::keys::StableValue;
use crate::metrics::{MetricsRecorder, MetricsSnapshot};
use crate::transaction::{self, SessionProvider, TransactionOptions, TransactionScope};

static GLOBAL: Lazy<Middleware> = Lazy::new(Middleware::new);

struct Inner {
    adapter: RwLock<Arc<dyn CacheAdapter>>,
    logger: RwLock<Arc<dyn Logger>>,
    metrics: MetricsRecorder,
}

// == Middleware ==
/// Shared handle to the adapter, logger and metrics. Cloning is cheap and
/// every clone sees the same state.
#[derive(Clone)]
pub struct Middleware {
    inner: Arc<Inner>,
}

impl Default for Middleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware {
    /// Fresh context: no-op adapter, no-op logger, zeroed metrics.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                adapter: RwLock::new(Arc::new(NoopAdapter)),
                logger: RwLock::new(Arc::new(NoopLogger)),
                metrics: MetricsRecorder::new(),
            }),
        }
    }

    /// The process-wide context.
    pub fn global() -> &'static Middleware {
        &GLOBAL
    }

    // == Configuration ==
    /// Installs `adapter`, or the no-op adapter when `None`.
    pub fn configure_cache(&self, adapter: Option<Arc<dyn CacheAdapter>>) {
        let configured = adapter.is_some();
        let adapter = adapter.unwrap_or_else(|| Arc::new(NoopAdapter));
        *self.inner.adapter.write().unwrap_or_else(PoisonError::into_inner) = adapter;
        info!(configured, "cache adapter installed");
    }

    /// Installs `logger`, or the no-op logger when `None`.
    pub fn set_logger(&self, logger: Option<Arc<dyn Logger>>) {
        let logger = logger.unwrap_or_else(|| Arc::new(NoopLogger));
        *self.inner.logger.write().unwrap_or_else(PoisonError::into_inner) = logger;
    }

    /// Restores the no-op adapter and logger and zeroes the metrics.
    pub fn reset(&self) {
        self.configure_cache(None);
        self.set_logger(None);
        self.inner.metrics.reset();
    }

    pub fn adapter(&self) -> Arc<dyn CacheAdapter> {
        self.inner
            .adapter
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn logger(&self) -> Arc<dyn Logger> {
        self.inner
            .logger
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn metrics(&self) -> &MetricsRecorder {
        &self.inner.metrics
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.inner.metrics.reset();
    }

    // == Envelopes ==
    pub fn ok(&self, data: impl Into<Value>) -> Envelope {
        Envelope::ok(data)
    }

    /// Logs `err` with `context`, then returns the failure envelope.
    pub fn fail(&self, err: MiddlewareError, context: &str) -> Envelope {
        envelope::fail(self.logger().as_ref(), err, context)
    }

    /// Runs `work`, guaranteeing an envelope even on panic.
    pub async fn safe_query<F, R>(&self, context: &str, work: F) -> Envelope
    where
        F: Future<Output = R>,
        R: IntoEnvelope,
    {
        let logger = self.logger();
        envelope::safe_query(logger.as_ref(), context, work).await
    }

    // == Cache ==
    /// Read-through caching of `producer`; see [`CacheOrchestrator::run`].
    pub async fn with_cache<F, Fut, R>(
        &self,
        op: &str,
        args: &[StableValue],
        options: Option<&CacheOptions>,
        producer: F,
    ) -> Envelope
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = R>,
        R: IntoEnvelope,
    {
        let adapter = self.adapter();
        let logger = self.logger();
        CacheOrchestrator::new(adapter.as_ref(), &self.inner.metrics, logger.as_ref())
            .run(op, args, options, producer)
            .await
    }

    /// Removes cache entries by key and prefix.
    pub async fn invalidate(&self, request: impl Into<InvalidationRequest>) -> Envelope {
        let adapter = self.adapter();
        let logger = self.logger();
        invalidate(adapter.as_ref(), &self.inner.metrics, logger.as_ref(), request.into()).await
    }

    /// Like [`Middleware::invalidate`] for loosely-typed input.
    pub async fn invalidate_value(&self, input: &Value) -> Envelope {
        match InvalidationRequest::from_value(input) {
            Ok(request) => self.invalidate(request).await,
            Err(err) => self.fail(err, "invalidate"),
        }
    }

    // == Transactions ==
    /// Bounded-retry transaction; see [`transaction::with_transaction`].
    pub async fn with_transaction<P, F, Fut>(
        &self,
        provider: &P,
        options: &TransactionOptions,
        work: F,
    ) -> Envelope
    where
        P: SessionProvider + ?Sized,
        F: FnMut(Arc<dyn TransactionScope>) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let logger = self.logger();
        transaction::with_transaction(provider, &self.inner.metrics, logger.as_ref(), options, work)
            .await
    }
}
