//! Idempotent collection and TTL-index reconciliation.
//!
//! Every step reads or acts, then treats the server's "already in the
//! desired state" codes as success. Errors are told apart by their store
//! error code only.

use mongo_log_sink_domain::{CollectionName, fields};
use mongo_log_sink_ports::{
    CreateCollectionOptions, DiagnosticLevel, DocumentStorePort, IndexSpec, LoggerPort,
    StoreErrorCode, diagnostic_fields,
};
use mongo_log_sink_shared::{ErrorEnvelope, RequestContext, Result};
use serde_json::Value;
use std::time::Duration;

/// Reserved name of the expiry index.
pub const TTL_INDEX_NAME: &str = "serilog_sink_expired_ttl";

/// Outcome of [`ensure_collection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// The collection was created by this call.
    Created,
    /// The collection was already there (or appeared concurrently).
    Existing,
}

/// Outcome of [`ensure_ttl_index`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlIndexOutcome {
    /// The index exists with the requested expiry.
    Applied,
    /// A conflicting index was dropped and recreated.
    Recreated,
    /// The conflicting index could not be replaced; the failure was logged.
    RecreateFailed,
    /// No expiry requested and no index remains.
    Absent,
}

/// Make sure `collection` exists, creating it with `options` when missing.
pub async fn ensure_collection(
    ctx: &RequestContext,
    store: &dyn DocumentStorePort,
    collection: &CollectionName,
    options: Option<CreateCollectionOptions>,
) -> Result<CollectionOutcome> {
    ctx.ensure_not_cancelled("ensure_collection")?;
    let existing = store
        .list_collection_names(ctx, Some(collection.clone()))
        .await?;
    if existing.iter().any(|name| name == collection) {
        return Ok(CollectionOutcome::Existing);
    }

    match store
        .create_collection(ctx, collection.clone(), options.unwrap_or_default())
        .await
    {
        Ok(()) => Ok(CollectionOutcome::Created),
        Err(error) if StoreErrorCode::NamespaceExists.matches(&error) => {
            Ok(CollectionOutcome::Existing)
        },
        Err(error) => Err(error),
    }
}

/// Converge the expiry index on `UtcTimeStamp` to `ttl`.
///
/// `Some(ttl)` creates the index, replacing one whose options or keys
/// conflict. A failed replacement is reported on `logger` and does not fail
/// the call. `None` drops the index if present.
pub async fn ensure_ttl_index(
    ctx: &RequestContext,
    store: &dyn DocumentStorePort,
    logger: Option<&dyn LoggerPort>,
    collection: &CollectionName,
    ttl: Option<Duration>,
) -> Result<TtlIndexOutcome> {
    ctx.ensure_not_cancelled("ensure_ttl_index")?;
    let Some(ttl) = ttl else {
        return drop_ttl_index(ctx, store, collection).await;
    };

    let spec = ttl_index_spec(ttl);
    match store.create_index(ctx, collection.clone(), spec.clone()).await {
        Ok(()) => Ok(TtlIndexOutcome::Applied),
        Err(error) if StoreErrorCode::IndexAlreadyExists.matches(&error) => {
            Ok(TtlIndexOutcome::Applied)
        },
        Err(error) if is_index_conflict(&error) => {
            match recreate(ctx, store, collection, spec).await {
                Ok(()) => Ok(TtlIndexOutcome::Recreated),
                Err(failure) if failure.is_cancelled() => Err(failure),
                Err(failure) => {
                    if let Some(logger) = logger {
                        logger.failure(
                            DiagnosticLevel::Warn,
                            "sink.ttl.recreate_failed",
                            "Could not replace the conflicting TTL index",
                            &failure,
                            Some(diagnostic_fields([
                                ("collection", Value::from(collection.as_str())),
                                ("index", Value::from(TTL_INDEX_NAME)),
                                ("ttlSeconds", Value::from(ttl.as_secs())),
                            ])),
                        );
                    }
                    Ok(TtlIndexOutcome::RecreateFailed)
                },
            }
        },
        Err(error) => Err(error),
    }
}

fn ttl_index_spec(ttl: Duration) -> IndexSpec {
    IndexSpec {
        name: TTL_INDEX_NAME.into(),
        field: fields::UTC_TIMESTAMP.into(),
        ascending: true,
        expire_after: Some(ttl),
    }
}

fn is_index_conflict(error: &ErrorEnvelope) -> bool {
    StoreErrorCode::IndexOptionsConflict.matches(error)
        || StoreErrorCode::IndexKeySpecsConflict.matches(error)
}

async fn recreate(
    ctx: &RequestContext,
    store: &dyn DocumentStorePort,
    collection: &CollectionName,
    spec: IndexSpec,
) -> Result<()> {
    match store
        .drop_index(ctx, collection.clone(), TTL_INDEX_NAME.into())
        .await
    {
        Ok(()) => {},
        Err(error) if StoreErrorCode::IndexNotFound.matches(&error) => {},
        Err(error) => return Err(error),
    }
    store.create_index(ctx, collection.clone(), spec).await
}

async fn drop_ttl_index(
    ctx: &RequestContext,
    store: &dyn DocumentStorePort,
    collection: &CollectionName,
) -> Result<TtlIndexOutcome> {
    match store
        .drop_index(ctx, collection.clone(), TTL_INDEX_NAME.into())
        .await
    {
        Ok(()) => Ok(TtlIndexOutcome::Absent),
        Err(error)
            if StoreErrorCode::IndexNotFound.matches(&error)
                || StoreErrorCode::NamespaceNotFound.matches(&error) =>
        {
            Ok(TtlIndexOutcome::Absent)
        },
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_ports::CappedCollectionOptions;
    use mongo_log_sink_testkit::errors::{store_error, unauthorized_error};
    use mongo_log_sink_testkit::in_memory::{
        InMemoryDocumentStore, RecordingLogger, StoreOperation,
    };

    fn log() -> Result<CollectionName> {
        CollectionName::parse("log").map_err(ErrorEnvelope::from)
    }

    async fn ttl_indexes(store: &InMemoryDocumentStore) -> Vec<Option<Duration>> {
        store
            .indexes("log")
            .await
            .into_iter()
            .filter(|index| index.name.as_ref() == TTL_INDEX_NAME)
            .map(|index| index.expire_after)
            .collect()
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() -> Result<()> {
        let ctx = RequestContext::new_batch();
        let store = InMemoryDocumentStore::new();
        let capped = CreateCollectionOptions {
            capped: Some(CappedCollectionOptions {
                max_size_bytes: 50 * 1024 * 1024,
                max_documents: None,
            }),
        };

        let first = ensure_collection(&ctx, &store, &log()?, Some(capped)).await?;
        let second = ensure_collection(&ctx, &store, &log()?, Some(capped)).await?;

        assert_eq!(first, CollectionOutcome::Created);
        assert_eq!(second, CollectionOutcome::Existing);
        assert_eq!(store.collection_names().await, ["log"]);
        assert_eq!(store.collection_options("log").await, Some(capped));
        assert_eq!(store.call_count(StoreOperation::CreateCollection), 1);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_creation_is_swallowed() -> Result<()> {
        let ctx = RequestContext::new_batch();
        let store = InMemoryDocumentStore::new();
        store.fail_next(
            StoreOperation::CreateCollection,
            store_error(StoreErrorCode::NamespaceExists),
        );

        let outcome = ensure_collection(&ctx, &store, &log()?, None).await?;
        assert_eq!(outcome, CollectionOutcome::Existing);
        Ok(())
    }

    #[tokio::test]
    async fn other_creation_errors_propagate() -> Result<()> {
        let ctx = RequestContext::new_batch();
        let store = InMemoryDocumentStore::new();
        store.fail_next(StoreOperation::CreateCollection, unauthorized_error());

        let error = ensure_collection(&ctx, &store, &log()?, None).await.err();
        assert_eq!(
            error.map(|error| error.code.code().to_owned()),
            Some("Unauthorized".to_owned())
        );
        Ok(())
    }

    #[tokio::test]
    async fn ttl_changes_converge_to_one_index() -> Result<()> {
        let ctx = RequestContext::new_batch();
        let store = InMemoryDocumentStore::new();
        let logger = RecordingLogger::new();
        ensure_collection(&ctx, &store, &log()?, None).await?;

        let first = ensure_ttl_index(
            &ctx,
            &store,
            Some(&logger),
            &log()?,
            Some(Duration::from_secs(30 * 60)),
        )
        .await?;
        let second = ensure_ttl_index(
            &ctx,
            &store,
            Some(&logger),
            &log()?,
            Some(Duration::from_secs(60 * 60)),
        )
        .await?;

        assert_eq!(first, TtlIndexOutcome::Applied);
        assert_eq!(second, TtlIndexOutcome::Recreated);
        assert_eq!(ttl_indexes(&store).await, [Some(Duration::from_secs(3600))]);

        let removed = ensure_ttl_index(&ctx, &store, Some(&logger), &log()?, None).await?;
        assert_eq!(removed, TtlIndexOutcome::Absent);
        assert!(ttl_indexes(&store).await.is_empty());
        assert!(logger.events().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn same_ttl_twice_is_a_no_op() -> Result<()> {
        let ctx = RequestContext::new_batch();
        let store = InMemoryDocumentStore::new();
        let ttl = Some(Duration::from_secs(600));

        ensure_ttl_index(&ctx, &store, None, &log()?, ttl).await?;
        let again = ensure_ttl_index(&ctx, &store, None, &log()?, ttl).await?;

        assert_eq!(again, TtlIndexOutcome::Applied);
        assert_eq!(store.call_count(StoreOperation::DropIndex), 0);
        Ok(())
    }

    #[tokio::test]
    async fn dropping_a_missing_index_or_collection_succeeds() -> Result<()> {
        let ctx = RequestContext::new_batch();
        let store = InMemoryDocumentStore::new();

        let missing_collection = ensure_ttl_index(&ctx, &store, None, &log()?, None).await?;
        ensure_collection(&ctx, &store, &log()?, None).await?;
        let missing_index = ensure_ttl_index(&ctx, &store, None, &log()?, None).await?;

        assert_eq!(missing_collection, TtlIndexOutcome::Absent);
        assert_eq!(missing_index, TtlIndexOutcome::Absent);
        Ok(())
    }

    #[tokio::test]
    async fn failed_recreate_is_logged_and_swallowed() -> Result<()> {
        let ctx = RequestContext::new_batch();
        let store = InMemoryDocumentStore::new();
        let logger = RecordingLogger::new();
        ensure_ttl_index(&ctx, &store, None, &log()?, Some(Duration::from_secs(60))).await?;
        store.fail_next(StoreOperation::DropIndex, unauthorized_error());

        let outcome = ensure_ttl_index(
            &ctx,
            &store,
            Some(&logger),
            &log()?,
            Some(Duration::from_secs(120)),
        )
        .await?;

        assert_eq!(outcome, TtlIndexOutcome::RecreateFailed);
        let events = logger.events_named("sink.ttl.recreate_failed");
        assert_eq!(events.len(), 1);
        assert_eq!(
            events.first().map(|event| event.level),
            Some(DiagnosticLevel::Warn)
        );
        assert_eq!(ttl_indexes(&store).await, [Some(Duration::from_secs(60))]);
        Ok(())
    }

    #[tokio::test]
    async fn unexpected_drop_errors_propagate() -> Result<()> {
        let ctx = RequestContext::new_batch();
        let store = InMemoryDocumentStore::new();
        store.fail_next(StoreOperation::DropIndex, unauthorized_error());

        let error = ensure_ttl_index(&ctx, &store, None, &log()?, None).await.err();
        assert!(error.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_context_stops_before_store_calls() -> Result<()> {
        let ctx = RequestContext::new_batch();
        ctx.cancel();
        let store = InMemoryDocumentStore::new();

        let error = ensure_collection(&ctx, &store, &log()?, None).await.err();
        assert!(error.is_some_and(|error| error.is_cancelled()));
        assert!(store.calls().is_empty());
        Ok(())
    }
}
