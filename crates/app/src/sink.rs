//! Batch sink: store resolution, reconciliation, mapping, bulk insert.
//!
//! The sink has no timers of its own. An external batching scheduler hands
//! it batches through [`LogSink::emit_batch`] and signals idle periods
//! through [`LogSink::on_empty_batch`].

use crate::collection_namer::CollectionNamer;
use crate::entry_mapper::EntryMapper;
use crate::exception_serializer::{ExceptionFieldMap, ExceptionSerializer};
use crate::legacy_formatter::LegacyFormatter;
use crate::schema_reconciler::{CollectionOutcome, ensure_collection, ensure_ttl_index};
use crate::value_sanitizer::{KeyCollisionPolicy, ValueSanitizer};
use mongo_log_sink_domain::{CollectionName, LogEvent, LogRecord, RollingTarget};
use mongo_log_sink_ports::{
    ClockPort, CreateCollectionOptions, DiagnosticFields, DiagnosticLevel, DocumentStoreConnector,
    DocumentStorePort, InsertManyOptions, LoggerPort, SystemClock, diagnostic_fields,
};
use mongo_log_sink_shared::{RequestContext, Result, ResultExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Where the sink gets its store from.
#[derive(Clone)]
pub enum StoreSource {
    /// A store the host already opened.
    Ready(Arc<dyn DocumentStorePort>),
    /// Connect on first use.
    Connector(Arc<dyn DocumentStoreConnector>),
}

/// Layout of stored documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DocumentShape {
    /// Typed fields built by [`EntryMapper`].
    #[default]
    Structured,
    /// JSON-formatter layout built by [`LegacyFormatter`].
    Legacy,
}

/// Sink behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSinkOptions {
    /// Logical stream and rolling policy.
    pub target: RollingTarget,
    /// Options used when a collection has to be created.
    pub collection_options: Option<CreateCollectionOptions>,
    /// Document expiry; `None` removes any expiry index.
    pub expire_ttl: Option<Duration>,
    /// Store the raw message template next to the rendered message.
    pub include_message_template: bool,
    /// Passed through to every bulk insert.
    pub insert: InsertManyOptions,
    /// Dictionary/property key collision handling.
    pub key_collisions: KeyCollisionPolicy,
    /// Stored names of exception members.
    pub exception_fields: ExceptionFieldMap,
    /// Document layout.
    pub document_shape: DocumentShape,
}

impl LogSinkOptions {
    /// Defaults for `target`: no capping, no expiry, template included,
    /// ordered inserts, last key wins.
    #[must_use]
    pub fn new(target: RollingTarget) -> Self {
        Self {
            target,
            collection_options: None,
            expire_ttl: None,
            include_message_template: true,
            insert: InsertManyOptions::default(),
            key_collisions: KeyCollisionPolicy::default(),
            exception_fields: ExceptionFieldMap::default(),
            document_shape: DocumentShape::default(),
        }
    }
}

/// Writes batches of log events as documents.
pub struct LogSink {
    source: StoreSource,
    store: OnceCell<Arc<dyn DocumentStorePort>>,
    namer: CollectionNamer,
    mapper: EntryMapper,
    options: LogSinkOptions,
    reconciled: Mutex<HashMap<CollectionName, Arc<OnceCell<()>>>>,
    logger: Option<Arc<dyn LoggerPort>>,
}

impl LogSink {
    /// Create a sink. Nothing touches the store until the first batch.
    #[must_use]
    pub fn new(
        source: StoreSource,
        options: LogSinkOptions,
        logger: Option<Arc<dyn LoggerPort>>,
    ) -> Self {
        let values = ValueSanitizer::new(options.key_collisions);
        let mapper = EntryMapper::new(
            values,
            ExceptionSerializer::new(options.exception_fields.clone(), values),
        );
        let logger = logger.map(|logger| -> Arc<dyn LoggerPort> {
            Arc::from(logger.child(diagnostic_fields([(
                "target",
                Value::from(options.target.base_name().as_str()),
            )])))
        });
        Self {
            source,
            store: OnceCell::new(),
            namer: CollectionNamer::new(options.target.clone(), Arc::new(SystemClock)),
            mapper,
            options,
            reconciled: Mutex::new(HashMap::new()),
            logger,
        }
    }

    /// Replace the clock used to pick rolling collections.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn ClockPort>) -> Self {
        self.namer = CollectionNamer::new(self.options.target.clone(), clock);
        self
    }

    /// The sink's options.
    #[must_use]
    pub const fn options(&self) -> &LogSinkOptions {
        &self.options
    }

    /// Write one batch; returns the number of inserted documents.
    ///
    /// Events keep their order and go out in a single bulk insert. The first
    /// batch for each physical collection also reconciles its schema; a
    /// failed reconciliation is retried with the next batch.
    #[tracing::instrument(
        name = "sink.emit_batch",
        skip_all,
        fields(batch = %ctx.correlation_id(), events = events.len())
    )]
    pub async fn emit_batch(&self, ctx: &RequestContext, events: Vec<LogEvent>) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let mut collection = None;
        let result = self.write_batch(ctx, &events, &mut collection).await;
        if let Some(logger) = self.logger.as_deref() {
            let mut fields = batch_fields(ctx, events.len(), collection.as_ref());
            match &result {
                Ok(inserted) => {
                    fields.insert("inserted".into(), Value::from(*inserted));
                    logger.debug("sink.batch.inserted", "Batch written", Some(fields));
                },
                Err(error) if error.is_cancelled() => {},
                Err(error) => logger.failure(
                    DiagnosticLevel::Error,
                    "sink.batch.failed",
                    "Batch could not be written",
                    error,
                    Some(fields),
                ),
            }
        }
        result
    }

    /// Idle tick from the scheduler. Nothing to flush.
    #[allow(
        clippy::unused_self,
        clippy::unused_async,
        reason = "same async callback shape as emit_batch"
    )]
    pub async fn on_empty_batch(&self, ctx: &RequestContext) -> Result<()> {
        tracing::trace!(batch = %ctx.correlation_id(), "empty batch");
        Ok(())
    }

    /// Resolve the store, connecting on first use.
    ///
    /// Concurrent first callers share one connection attempt. A failed
    /// attempt is not cached.
    pub async fn store(&self, ctx: &RequestContext) -> Result<Arc<dyn DocumentStorePort>> {
        self.store
            .get_or_try_init(|| async {
                let connector = match &self.source {
                    StoreSource::Ready(store) => return Ok(Arc::clone(store)),
                    StoreSource::Connector(connector) => connector,
                };
                let store = connector.connect(ctx).await?;
                if let Some(logger) = self.logger.as_deref() {
                    let provider = store.provider();
                    logger.info(
                        "sink.store.resolved",
                        "Document store connected",
                        Some(diagnostic_fields([
                            ("provider", Value::from(provider.id.as_ref())),
                            ("providerName", Value::from(provider.name.as_ref())),
                        ])),
                    );
                }
                Ok(store)
            })
            .await
            .map(Arc::clone)
    }

    async fn write_batch(
        &self,
        ctx: &RequestContext,
        events: &[LogEvent],
        collection_out: &mut Option<CollectionName>,
    ) -> Result<usize> {
        ctx.ensure_not_cancelled("emit_batch")?;
        let store = self.store(ctx).await?;
        let collection = self.namer.current()?;
        *collection_out = Some(collection.clone());

        self.reconcile(ctx, store.as_ref(), &collection).await?;

        let documents = match self.options.document_shape {
            DocumentShape::Structured => events
                .iter()
                .map(|event| {
                    self.mapper
                        .map_from(Some(event), self.options.include_message_template)
                        .map(LogRecord::into_document)
                })
                .collect::<Result<Vec<_>>>()?,
            DocumentShape::Legacy => events
                .iter()
                .map(|event| LegacyFormatter.format(event))
                .collect(),
        };

        ctx.ensure_not_cancelled("emit_batch.insert")?;
        store
            .insert_many(ctx, collection, documents, self.options.insert)
            .await
    }

    /// Reconcile `collection` once. Concurrent callers wait on the same
    /// attempt; a failed attempt leaves the slot empty for the next batch.
    async fn reconcile(
        &self,
        ctx: &RequestContext,
        store: &dyn DocumentStorePort,
        collection: &CollectionName,
    ) -> Result<()> {
        let slot = Arc::clone(
            self.reconciled
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(collection.clone())
                .or_default(),
        );
        slot.get_or_try_init(|| self.reconcile_collection(ctx, store, collection))
            .await?;
        Ok(())
    }

    async fn reconcile_collection(
        &self,
        ctx: &RequestContext,
        store: &dyn DocumentStorePort,
        collection: &CollectionName,
    ) -> Result<()> {
        let outcome = ensure_collection(ctx, store, collection, self.options.collection_options)
            .await
            .with_error_metadata("collection", collection.as_str())?;
        let ttl = ensure_ttl_index(
            ctx,
            store,
            self.logger.as_deref(),
            collection,
            self.options.expire_ttl,
        )
        .await
        .with_error_metadata("collection", collection.as_str())?;

        if let Some(logger) = self.logger.as_deref() {
            logger.info(
                "sink.collection.ensured",
                "Collection ready",
                Some(diagnostic_fields([
                    ("collection", Value::from(collection.as_str())),
                    ("created", Value::from(outcome == CollectionOutcome::Created)),
                    ("ttlIndex", Value::from(format!("{ttl:?}"))),
                ])),
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("LogSink")
            .field("options", &self.options)
            .field("store_resolved", &self.store.initialized())
            .finish_non_exhaustive()
    }
}

fn batch_fields(
    ctx: &RequestContext,
    events: usize,
    collection: Option<&CollectionName>,
) -> DiagnosticFields {
    let mut fields = diagnostic_fields([
        ("correlationId", Value::from(ctx.correlation_id().as_str())),
        ("events", Value::from(events)),
    ]);
    if let Some(collection) = collection {
        fields.insert("collection".into(), Value::from(collection.as_str()));
    }
    fields
}
