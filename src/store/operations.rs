//! Store Operations
//!
//! The public operation table. Every operation resolves its entity, runs
//! against the store (through the cache for reads), records its latency
//! under `"<op>:<entity>"` and returns an [`Envelope`]. Writes invalidate
//! the cache only after the store has acknowledged them.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};
use tracing::warn;

use super::args::{entity_arg, required_object_arg};
use super::{AggregateArgs, DocumentStore, EntityResolver, PassthroughResolver, QueryArgs};
use crate::context::Middleware;
use crate::envelope::Envelope;
use crate::error::{MiddlewareError, Result};
use crate::models::{parse_write_arg, WriteDirectives};
use crate::transaction::{TransactionOptions, TransactionScope};

/// Names accepted by [`Operations::safe_query`].
pub const OPERATION_NAMES: [&str; 8] = [
    "getOne",
    "getMany",
    "count",
    "aggregate",
    "insert",
    "update",
    "delete",
    "invalidate",
];

// == Operations ==
pub struct Operations<S: ?Sized> {
    store: Arc<S>,
    resolver: Arc<dyn EntityResolver>,
    middleware: Middleware,
}

impl<S: DocumentStore + ?Sized> Operations<S> {
    /// Operations over `store`, resolving entities as collection names.
    pub fn new(store: Arc<S>, middleware: Middleware) -> Self {
        Self {
            store,
            resolver: Arc::new(PassthroughResolver),
            middleware,
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn EntityResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn middleware(&self) -> &Middleware {
        &self.middleware
    }

    // == Reads ==
    pub async fn get_one(&self, args: QueryArgs) -> Envelope {
        let query = &args;
        self.timed("getOne", &args.entity, |collection| async move {
            self.middleware
                .with_cache("getOne", &query.key_args(), query.cache.as_ref(), || async {
                    self.store
                        .find_one(&collection, &query.filter, &query.find)
                        .await
                })
                .await
        })
        .await
    }

    pub async fn get_many(&self, args: QueryArgs) -> Envelope {
        let query = &args;
        self.timed("getMany", &args.entity, |collection| async move {
            self.middleware
                .with_cache("getMany", &query.key_args(), query.cache.as_ref(), || async {
                    self.store
                        .find_many(&collection, &query.filter, &query.find)
                        .await
                })
                .await
        })
        .await
    }

    pub async fn count(&self, args: QueryArgs) -> Envelope {
        let query = &args;
        self.timed("count", &args.entity, |collection| async move {
            self.middleware
                .with_cache("count", &query.key_args(), query.cache.as_ref(), || async {
                    self.store.count(&collection, &query.filter).await
                })
                .await
        })
        .await
    }

    pub async fn aggregate(&self, args: AggregateArgs) -> Envelope {
        let query = &args;
        self.timed("aggregate", &args.entity, |collection| async move {
            self.middleware
                .with_cache("aggregate", &query.key_args(), query.cache.as_ref(), || async {
                    self.store.aggregate(&collection, &query.pipeline).await
                })
                .await
        })
        .await
    }

    // == Writes ==
    /// Inserts one document (object) or several (non-empty list of objects).
    pub async fn insert(&self, entity: &str, documents: Value, write_arg: Option<&Value>) -> Envelope {
        let documents = match documents {
            Value::Object(_) => vec![documents],
            Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object) => items,
            _ => {
                return self.middleware.fail(
                    MiddlewareError::Validation(
                        "documents must be an object or a non-empty list of objects".to_string(),
                    ),
                    "insert",
                )
            }
        };

        self.write("insert", entity, write_arg, |collection, options| async move {
            self.store
                .insert(&collection, documents, options.as_ref())
                .await
        })
        .await
    }

    /// `filter` must be an object; pass `{}` to target every document.
    pub async fn update(
        &self,
        entity: &str,
        filter: Value,
        update: Value,
        write_arg: Option<&Value>,
    ) -> Envelope {
        let parsed = required_object_arg(&filter, "filter").and_then(|filter| {
            match update {
                Value::Object(update) if !update.is_empty() => Ok((filter, update)),
                _ => Err(MiddlewareError::Validation(
                    "update must be a non-empty object".to_string(),
                )),
            }
        });
        let (filter, update) = match parsed {
            Ok(parsed) => parsed,
            Err(err) => return self.middleware.fail(err, "update"),
        };

        self.write("update", entity, write_arg, |collection, options| async move {
            self.store
                .update(&collection, &filter, &update, options.as_ref())
                .await
        })
        .await
    }

    /// `filter` must be an object; pass `{}` to target every document.
    pub async fn delete(&self, entity: &str, filter: Value, write_arg: Option<&Value>) -> Envelope {
        let filter = match required_object_arg(&filter, "filter") {
            Ok(filter) => filter,
            Err(err) => return self.middleware.fail(err, "delete"),
        };

        self.write("delete", entity, write_arg, |collection, options| async move {
            self.store.delete(&collection, &filter, options.as_ref()).await
        })
        .await
    }

    // == Transactions ==
    /// Runs `work` in a retried transaction on a session of this store.
    pub async fn transaction<F, Fut>(&self, options: &TransactionOptions, work: F) -> Envelope
    where
        F: FnMut(Arc<dyn TransactionScope>) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        self.middleware
            .with_transaction(self.store.as_ref(), options, work)
            .await
    }

    // == Dispatch ==
    /// Runs the operation called `name` with loosely-typed arguments.
    ///
    /// Writes take `[entity, documents, writeArg]` (insert),
    /// `[entity, filter, update, writeArg]` (update) and
    /// `[entity, filter, writeArg]` (delete). A panic anywhere below is
    /// reported as a failure envelope.
    pub async fn safe_query(&self, name: &str, args: &[Value]) -> Envelope {
        self.middleware
            .safe_query(name, self.dispatch(name, args))
            .await
    }

    async fn dispatch(&self, name: &str, args: &[Value]) -> Envelope {
        let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);
        let entity = args.first().and_then(Value::as_str).unwrap_or_default();

        match name {
            "getOne" => match QueryArgs::parse(args) {
                Ok(query) => self.get_one(query).await,
                Err(err) => self.middleware.fail(err, name),
            },
            "getMany" => match QueryArgs::parse(args) {
                Ok(query) => self.get_many(query).await,
                Err(err) => self.middleware.fail(err, name),
            },
            "count" => match QueryArgs::parse(args) {
                Ok(query) => self.count(query).await,
                Err(err) => self.middleware.fail(err, name),
            },
            "aggregate" => match AggregateArgs::parse(args) {
                Ok(query) => self.aggregate(query).await,
                Err(err) => self.middleware.fail(err, name),
            },
            "insert" => self.insert(entity, arg(1), args.get(2)).await,
            "update" => self.update(entity, arg(1), arg(2), args.get(3)).await,
            "delete" => self.delete(entity, arg(1), args.get(2)).await,
            "invalidate" => self.middleware.invalidate_value(&arg(0)).await,
            _ => self.middleware.fail(
                MiddlewareError::Resolution(format!(
                    "unknown operation: {} (expected one of {})",
                    name,
                    OPERATION_NAMES.join(", ")
                )),
                "safeQuery",
            ),
        }
    }

    // == Helpers ==
    /// Resolves `entity`, runs `body` on the collection and records latency.
    async fn timed<F, Fut>(&self, op: &str, entity: &str, body: F) -> Envelope
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Envelope>,
    {
        let started = Instant::now();
        let envelope = match self.resolver.resolve(entity) {
            Ok(collection) => body(collection).await,
            Err(err) => self.middleware.fail(err, op),
        };
        self.middleware
            .metrics()
            .record_timing(&format!("{}:{}", op, entity), started);
        envelope
    }

    /// Persists through `persist`, then applies the invalidation hints of
    /// `write_arg`. A failed write invalidates nothing.
    async fn write<F, Fut>(
        &self,
        op: &str,
        entity: &str,
        write_arg: Option<&Value>,
        persist: F,
    ) -> Envelope
    where
        F: FnOnce(String, Option<Map<String, Value>>) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        if let Err(err) = entity_arg(Some(&Value::from(entity))) {
            return self.middleware.fail(err, op);
        }
        let directives: WriteDirectives = parse_write_arg(write_arg);

        self.timed(op, entity, |collection| async move {
            match persist(collection, directives.options.clone()).await {
                Ok(result) => {
                    if directives.has_invalidation() {
                        let outcome = self.middleware.invalidate(&directives).await;
                        if !outcome.status {
                            warn!(op, entity, "post-write invalidation failed");
                        }
                    }
                    Envelope::ok(result)
                }
                Err(err) => self.middleware.fail(err, op),
            }
        })
        .await
    }
}
