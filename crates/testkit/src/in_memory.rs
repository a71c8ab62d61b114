//! In-memory adapter implementations for port contracts.
//!
//! These implementations are intended for:
//! - Unit/integration tests
//! - Deterministic contract tests for the ports layer
//! - Local experimentation without a running database
//!
//! `InMemoryDocumentStore` follows the server's observable behavior for the
//! operations the sink uses, including the numeric error codes, so code that
//! discriminates on `StoreErrorCode` can be exercised without a server.

use chrono::{DateTime, Utc};
use mongo_log_sink_ports::{
    BoxFuture, ClockPort, CollectionName, CreateCollectionOptions, DiagnosticEvent,
    DiagnosticFields, DiagnosticLevel, Document, DocumentStoreConnector, DocumentStorePort,
    IndexInfo, IndexSpec, InsertManyOptions, LoggerPort, StoreErrorCode, StoreProviderInfo,
};
use mongo_log_sink_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

const ID_INDEX_NAME: &str = "_id_";

/// A no-op logger implementation.
#[derive(Debug, Default)]
pub struct NoopLogger;

impl LoggerPort for NoopLogger {
    fn log(&self, _event: DiagnosticEvent) {}

    fn child(&self, _fields: DiagnosticFields) -> Box<dyn LoggerPort> {
        Box::new(Self)
    }
}

/// Logger that keeps every event for later assertions.
///
/// Children share the parent's buffer and merge their base fields into each
/// event.
#[derive(Debug, Clone, Default)]
pub struct RecordingLogger {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
    base: DiagnosticFields,
}

impl RecordingLogger {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded events with the given name.
    pub fn events_named(&self, name: &str) -> Vec<DiagnosticEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.event.as_ref() == name)
            .collect()
    }

    /// Recorded events at or above `level`.
    pub fn events_at_least(&self, level: DiagnosticLevel) -> Vec<DiagnosticEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.level >= level)
            .collect()
    }
}

impl LoggerPort for RecordingLogger {
    fn log(&self, mut event: DiagnosticEvent) {
        if !self.base.is_empty() {
            let mut merged = self.base.clone();
            if let Some(fields) = event.fields.take() {
                merged.extend(fields);
            }
            event.fields = Some(merged);
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn child(&self, fields: DiagnosticFields) -> Box<dyn LoggerPort> {
        let mut base = self.base.clone();
        base.extend(fields);
        Box::new(Self {
            events: Arc::clone(&self.events),
            base,
        })
    }
}

/// Clock pinned to a settable instant.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    /// Create a clock reading `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }
}

impl ClockPort for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Store operations, for call recording and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// `list_collection_names`
    ListCollectionNames,
    /// `create_collection`
    CreateCollection,
    /// `list_indexes`
    ListIndexes,
    /// `create_index`
    CreateIndex,
    /// `drop_index`
    DropIndex,
    /// `insert_many`
    InsertMany,
}

/// A recorded store call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreCall {
    /// Operation invoked.
    pub operation: StoreOperation,
    /// Target collection.
    pub collection: Option<Box<str>>,
    /// Index name for index operations.
    pub index: Option<Box<str>>,
    /// Document count for inserts.
    pub documents: Option<usize>,
    /// Insert options for inserts.
    pub insert_options: Option<InsertManyOptions>,
}

impl StoreCall {
    fn new(operation: StoreOperation, collection: Option<&CollectionName>) -> Self {
        Self {
            operation,
            collection: collection.map(|name| name.as_str().into()),
            index: None,
            documents: None,
            insert_options: None,
        }
    }
}

#[derive(Debug, Clone)]
struct CollectionState {
    options: CreateCollectionOptions,
    indexes: Vec<IndexInfo>,
    documents: Vec<Document>,
}

impl CollectionState {
    fn new(options: CreateCollectionOptions) -> Self {
        Self {
            options,
            indexes: vec![IndexInfo {
                name: ID_INDEX_NAME.into(),
                keys: vec![("_id".into(), 1)],
                expire_after: None,
            }],
            documents: Vec::new(),
        }
    }

    fn push(&mut self, documents: Vec<Document>) {
        self.documents.extend(documents);
        let Some(max_documents) = self
            .options
            .capped
            .and_then(|capped| capped.max_documents)
            .and_then(|max| usize::try_from(max).ok())
        else {
            return;
        };
        if self.documents.len() > max_documents {
            let overflow = self.documents.len() - max_documents;
            self.documents.drain(..overflow);
        }
    }
}

/// In-memory document store emulating server error codes.
#[derive(Debug)]
pub struct InMemoryDocumentStore {
    provider: StoreProviderInfo,
    collections: RwLock<BTreeMap<String, CollectionState>>,
    calls: Mutex<Vec<StoreCall>>,
    failures: Mutex<VecDeque<(StoreOperation, ErrorEnvelope)>>,
    yielding: AtomicBool,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider: StoreProviderInfo {
                id: "in-memory".into(),
                name: "In-memory document store".into(),
            },
            collections: RwLock::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            yielding: AtomicBool::new(false),
        }
    }

    /// Yield to the scheduler at the start of every operation, like a real
    /// round trip would, so concurrent callers interleave.
    pub fn yield_on_every_call(&self) {
        self.yielding.store(true, Ordering::SeqCst);
    }

    /// Fail the next call to `operation` with `error`.
    ///
    /// Injected failures are consumed in FIFO order per operation.
    pub fn fail_next(&self, operation: StoreOperation, error: ErrorEnvelope) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back((operation, error));
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of calls made to `operation`.
    pub fn call_count(&self, operation: StoreOperation) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.operation == operation)
            .count()
    }

    /// Forget recorded calls.
    pub fn clear_calls(&self) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Existing collection names, sorted.
    pub async fn collection_names(&self) -> Vec<String> {
        self.collections.read().await.keys().cloned().collect()
    }

    /// Documents stored in a collection, in insertion order.
    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|state| state.documents.clone())
            .unwrap_or_default()
    }

    /// Indexes of a collection (including `_id_`).
    pub async fn indexes(&self, collection: &str) -> Vec<IndexInfo> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|state| state.indexes.clone())
            .unwrap_or_default()
    }

    /// Creation options of a collection.
    pub async fn collection_options(&self, collection: &str) -> Option<CreateCollectionOptions> {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|state| state.options)
    }

    fn record(&self, call: StoreCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    fn take_failure(&self, operation: StoreOperation) -> Option<ErrorEnvelope> {
        let mut failures = self.failures.lock().unwrap_or_else(PoisonError::into_inner);
        let position = failures.iter().position(|(op, _)| *op == operation)?;
        failures.remove(position).map(|(_, error)| error)
    }

    async fn begin(
        &self,
        ctx: &RequestContext,
        call: StoreCall,
        operation: &'static str,
    ) -> Result<()> {
        if self.yielding.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
        let kind = call.operation;
        self.record(call);
        ctx.ensure_not_cancelled(operation)?;
        self.take_failure(kind).map_or(Ok(()), Err)
    }
}

fn namespace_not_found(collection: &CollectionName) -> ErrorEnvelope {
    StoreErrorCode::NamespaceNotFound
        .to_error(format!("ns does not exist: {collection}"))
        .with_metadata("collection", collection.as_str())
}

fn index_matches_spec(existing: &IndexInfo, spec: &IndexSpec) -> bool {
    let direction = if spec.ascending { 1 } else { -1 };
    existing.keys.len() == 1
        && existing
            .keys
            .first()
            .is_some_and(|(field, dir)| field.as_ref() == spec.field.as_ref() && *dir == direction)
}

impl DocumentStorePort for InMemoryDocumentStore {
    fn provider(&self) -> &StoreProviderInfo {
        &self.provider
    }

    fn list_collection_names(
        &self,
        ctx: &RequestContext,
        name_filter: Option<CollectionName>,
    ) -> BoxFuture<'_, Result<Vec<CollectionName>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.begin(
                &ctx,
                StoreCall::new(StoreOperation::ListCollectionNames, name_filter.as_ref()),
                "in_memory_store.list_collection_names",
            )
            .await?;
            let state = self.collections.read().await;
            state
                .keys()
                .filter(|name| {
                    name_filter
                        .as_ref()
                        .is_none_or(|filter| filter.as_str() == name.as_str())
                })
                .map(|name| CollectionName::parse(name).map_err(ErrorEnvelope::from))
                .collect()
        })
    }

    fn create_collection(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        options: CreateCollectionOptions,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.begin(
                &ctx,
                StoreCall::new(StoreOperation::CreateCollection, Some(&collection_name)),
                "in_memory_store.create_collection",
            )
            .await?;
            let mut state = self.collections.write().await;
            if state.contains_key(collection_name.as_str()) {
                return Err(StoreErrorCode::NamespaceExists
                    .to_error(format!("Collection already exists. NS: {collection_name}"))
                    .with_metadata("collection", collection_name.as_str()));
            }
            state.insert(
                collection_name.as_str().to_owned(),
                CollectionState::new(options),
            );
            Ok(())
        })
    }

    fn list_indexes(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<Vec<IndexInfo>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.begin(
                &ctx,
                StoreCall::new(StoreOperation::ListIndexes, Some(&collection_name)),
                "in_memory_store.list_indexes",
            )
            .await?;
            let state = self.collections.read().await;
            state
                .get(collection_name.as_str())
                .map(|collection| collection.indexes.clone())
                .ok_or_else(|| namespace_not_found(&collection_name))
        })
    }

    fn create_index(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        index: IndexSpec,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let mut call = StoreCall::new(StoreOperation::CreateIndex, Some(&collection_name));
            call.index = Some(index.name.clone());
            self.begin(&ctx, call, "in_memory_store.create_index").await?;

            let mut state = self.collections.write().await;
            let collection = state
                .entry(collection_name.as_str().to_owned())
                .or_insert_with(|| CollectionState::new(CreateCollectionOptions::default()));

            if let Some(existing) = collection
                .indexes
                .iter()
                .find(|existing| existing.name == index.name)
            {
                if !index_matches_spec(existing, &index) {
                    return Err(StoreErrorCode::IndexKeySpecsConflict.to_error(format!(
                        "An existing index has the same name as the requested index: {}",
                        index.name
                    )));
                }
                if existing.expire_after != index.expire_after {
                    return Err(StoreErrorCode::IndexOptionsConflict.to_error(format!(
                        "An equivalent index already exists with the same name but different options: {}",
                        index.name
                    )));
                }
                return Ok(());
            }

            if collection
                .indexes
                .iter()
                .any(|existing| index_matches_spec(existing, &index))
            {
                return Err(StoreErrorCode::IndexOptionsConflict.to_error(format!(
                    "Index already exists with a different name: {}",
                    index.name
                )));
            }

            let direction = if index.ascending { 1 } else { -1 };
            collection.indexes.push(IndexInfo {
                name: index.name,
                keys: vec![(index.field, direction)],
                expire_after: index.expire_after,
            });
            Ok(())
        })
    }

    fn drop_index(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        index_name: Box<str>,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let mut call = StoreCall::new(StoreOperation::DropIndex, Some(&collection_name));
            call.index = Some(index_name.clone());
            self.begin(&ctx, call, "in_memory_store.drop_index").await?;

            let mut state = self.collections.write().await;
            let collection = state
                .get_mut(collection_name.as_str())
                .ok_or_else(|| namespace_not_found(&collection_name))?;
            let position = collection
                .indexes
                .iter()
                .position(|existing| existing.name == index_name)
                .ok_or_else(|| {
                    StoreErrorCode::IndexNotFound
                        .to_error(format!("index not found with name [{index_name}]"))
                })?;
            collection.indexes.remove(position);
            Ok(())
        })
    }

    fn insert_many(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
        documents: Vec<Document>,
        options: InsertManyOptions,
    ) -> BoxFuture<'_, Result<usize>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let mut call = StoreCall::new(StoreOperation::InsertMany, Some(&collection_name));
            call.documents = Some(documents.len());
            call.insert_options = Some(options);
            self.begin(&ctx, call, "in_memory_store.insert_many").await?;

            if documents.is_empty() {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::invalid_input(),
                    "insert_many requires at least one document",
                ));
            }

            let count = documents.len();
            let mut state = self.collections.write().await;
            state
                .entry(collection_name.as_str().to_owned())
                .or_insert_with(|| CollectionState::new(CreateCollectionOptions::default()))
                .push(documents);
            Ok(count)
        })
    }
}

/// Connector handing out a shared in-memory store and counting connects.
#[derive(Debug, Clone)]
pub struct InMemoryConnector {
    store: Arc<InMemoryDocumentStore>,
    connects: Arc<AtomicUsize>,
    failure: Option<ErrorEnvelope>,
}

impl InMemoryConnector {
    /// Connector for `store`.
    #[must_use]
    pub fn new(store: Arc<InMemoryDocumentStore>) -> Self {
        Self {
            store,
            connects: Arc::new(AtomicUsize::new(0)),
            failure: None,
        }
    }

    /// Connector whose every connect attempt fails with `error`.
    #[must_use]
    pub fn failing(error: ErrorEnvelope) -> Self {
        Self {
            failure: Some(error),
            ..Self::new(Arc::new(InMemoryDocumentStore::new()))
        }
    }

    /// Number of connect calls so far.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl DocumentStoreConnector for InMemoryConnector {
    fn connect(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<Arc<dyn DocumentStorePort>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            ctx.ensure_not_cancelled("in_memory_connector.connect")?;
            // Let concurrent first callers pile up on the same initialization.
            tokio::task::yield_now().await;
            if let Some(error) = &self.failure {
                return Err(error.clone());
            }
            let store: Arc<dyn DocumentStorePort> = self.store.clone();
            Ok(store)
        })
    }
}
