// Allow missing docs in integration test.
#![allow(missing_docs)]
//! Live checks against a MongoDB server.
//!
//! Skipped unless `MONGO_SINK_TEST_CONNECTION_STRING` names a disposable
//! database (e.g. `mongodb://localhost:27017/sink_it`).

use mongo_log_sink_adapters::MongoConnector;
use mongo_log_sink_domain::{CollectionName, Document};
use mongo_log_sink_ports::{
    CappedCollectionOptions, CreateCollectionOptions, DocumentStoreConnector, IndexSpec,
    InsertManyOptions, StoreErrorCode,
};
use mongo_log_sink_shared::{ErrorEnvelope, RequestContext, Result, SecretString};
use std::time::Duration;

const CONNECTION_ENV: &str = "MONGO_SINK_TEST_CONNECTION_STRING";

fn connector() -> Option<MongoConnector> {
    std::env::var(CONNECTION_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(|value| MongoConnector::new(SecretString::new(value)))
}

fn unique_collection(prefix: &str) -> Result<CollectionName> {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    CollectionName::parse(format!("{prefix}_{nanos:x}")).map_err(ErrorEnvelope::from)
}

fn ttl_index(seconds: u64) -> IndexSpec {
    IndexSpec {
        name: "serilog_sink_expired_ttl".into(),
        field: "UtcTimeStamp".into(),
        ascending: true,
        expire_after: Some(Duration::from_secs(seconds)),
    }
}

#[tokio::test]
async fn server_codes_surface_as_store_errors() -> Result<()> {
    let Some(connector) = connector() else {
        return Ok(());
    };
    let ctx = RequestContext::new_batch();
    let store = connector.connect(&ctx).await?;
    let name = unique_collection("it_codes")?;

    store
        .create_collection(
            &ctx,
            name.clone(),
            CreateCollectionOptions {
                capped: Some(CappedCollectionOptions {
                    max_size_bytes: 1024 * 1024,
                    max_documents: Some(10),
                }),
            },
        )
        .await?;
    let exists = store
        .create_collection(&ctx, name.clone(), CreateCollectionOptions::default())
        .await
        .err();
    assert!(exists.is_some_and(|error| StoreErrorCode::NamespaceExists.matches(&error)));

    store.create_index(&ctx, name.clone(), ttl_index(1800)).await?;
    let conflict = store
        .create_index(&ctx, name.clone(), ttl_index(3600))
        .await
        .err();
    assert!(conflict.is_some_and(|error| StoreErrorCode::IndexOptionsConflict.matches(&error)));

    store
        .drop_index(&ctx, name.clone(), "serilog_sink_expired_ttl".into())
        .await?;
    let missing = store
        .drop_index(&ctx, name.clone(), "serilog_sink_expired_ttl".into())
        .await
        .err();
    assert!(missing.is_some_and(|error| StoreErrorCode::IndexNotFound.matches(&error)));

    let mut document = Document::new();
    document.insert("Level", "Information");
    let inserted = store
        .insert_many(&ctx, name.clone(), vec![document], InsertManyOptions::default())
        .await?;
    assert_eq!(inserted, 1);

    let listed = store.list_collection_names(&ctx, Some(name.clone())).await?;
    assert_eq!(listed, vec![name]);
    Ok(())
}
