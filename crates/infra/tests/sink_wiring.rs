//! Wiring tests: config in, working sink out.

use chrono::{TimeZone, Utc};
use mongo_log_sink_config::{SinkConfig, SinkEnv, apply_env_overrides, parse_sink_config_json};
use mongo_log_sink_domain::{LogEvent, LogLevel};
use mongo_log_sink_infra::{build_sink, load_validated_config};
use mongo_log_sink_ports::DocumentStorePort;
use mongo_log_sink_shared::RequestContext;
use mongo_log_sink_testkit::in_memory::{InMemoryDocumentStore, RecordingLogger, StoreOperation};
use std::collections::BTreeMap;
use std::sync::Arc;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::test]
async fn host_store_sink_writes_with_configured_options() -> TestResult {
    let config = parse_sink_config_json(
        r#"{
            "databaseName": "logs",
            "collectionName": "audit",
            "expireTtlSeconds": 60,
            "insert": { "ordered": false }
        }"#,
    )?;
    let store = Arc::new(InMemoryDocumentStore::new());
    let host_store: Arc<dyn DocumentStorePort> = store.clone();
    let logger = RecordingLogger::new();
    let sink = build_sink(&config, Some(host_store), Some(Arc::new(logger.clone())))?;

    let timestamp = Utc
        .with_ymd_and_hms(2022, 10, 15, 8, 30, 0)
        .single()
        .ok_or("fixture time")?;
    let inserted = sink
        .emit_batch(
            &RequestContext::new_batch(),
            vec![LogEvent::at_utc(timestamp, LogLevel::Information, "started")],
        )
        .await?;

    assert_eq!(inserted, 1);
    assert_eq!(store.documents("audit").await.len(), 1);
    let insert = store
        .calls()
        .into_iter()
        .find(|call| call.operation == StoreOperation::InsertMany)
        .ok_or("insert not recorded")?;
    assert_eq!(insert.insert_options.map(|options| options.ordered), Some(false));
    assert_eq!(logger.events_named("sink.configured").len(), 1);
    assert_eq!(logger.events_named("sink.batch.inserted").len(), 1);
    Ok(())
}

#[test]
fn env_connection_string_builds_without_connecting() -> TestResult {
    let env = SinkEnv::from_map(&BTreeMap::from([(
        "MONGO_SINK_CONNECTION_STRING".to_owned(),
        "mongodb://127.0.0.1:9/logs".to_owned(),
    )]))?;
    let config = apply_env_overrides(SinkConfig::default(), &env)?;

    let sink = build_sink(&config, None, None)?;

    assert_eq!(sink.options().target.base_name().as_str(), "log");
    Ok(())
}

#[test]
fn missing_target_is_reported() -> TestResult {
    let config = load_validated_config(&BTreeMap::new(), None)?;
    let error = build_sink(&config, None, None).err().ok_or("expected an error")?;
    assert_eq!(error.code.to_string(), "config:missing_target");
    Ok(())
}
