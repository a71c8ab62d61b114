//! Sink assembly from validated configuration.

use crate::InfraResult;
use mongo_log_sink_adapters::MongoConnector;
use mongo_log_sink_app::{DocumentShape, KeyCollisionPolicy, LogSink, LogSinkOptions, StoreSource};
use mongo_log_sink_config::{
    DictionaryKeyCollision, DocumentShape as ConfigDocumentShape, StoreTarget, ValidatedSinkConfig,
};
use mongo_log_sink_domain::RollingTarget;
use mongo_log_sink_ports::{
    CappedCollectionOptions, CreateCollectionOptions, DocumentStorePort, InsertManyOptions,
    LoggerPort, diagnostic_fields,
};
use mongo_log_sink_shared::{ErrorCode, ErrorEnvelope, SecretString};
use serde_json::Value;
use std::sync::Arc;

/// Translate config into sink options.
#[must_use]
pub fn build_sink_options(config: &ValidatedSinkConfig) -> LogSinkOptions {
    let mut options = LogSinkOptions::new(RollingTarget::new(
        config.collection_name().clone(),
        config.rolling_interval,
    ));
    options.collection_options =
        config
            .capped_limits()
            .map(|(max_size_bytes, max_documents)| CreateCollectionOptions {
                capped: Some(CappedCollectionOptions {
                    max_size_bytes,
                    max_documents,
                }),
            });
    options.expire_ttl = config.expire_ttl();
    options.include_message_template = !config.exclude_message_template;
    options.insert = InsertManyOptions {
        ordered: config.insert.ordered,
        bypass_document_validation: config.insert.bypass_document_validation,
    };
    options.key_collisions = match config.dictionary_key_collision {
        DictionaryKeyCollision::KeepLast => KeyCollisionPolicy::KeepLast,
        DictionaryKeyCollision::KeepFirst => KeyCollisionPolicy::KeepFirst,
    };
    options.document_shape = match config.document_shape {
        ConfigDocumentShape::Structured => DocumentShape::Structured,
        ConfigDocumentShape::Legacy => DocumentShape::Legacy,
    };
    options
}

/// Pick the store source for the configured target.
///
/// A connection string yields a lazy MongoDB connector. A bare
/// `databaseName` (or no target at all) needs a store the host already
/// opened, passed as `host_store`.
pub fn build_store_source(
    config: &ValidatedSinkConfig,
    host_store: Option<Arc<dyn DocumentStorePort>>,
) -> InfraResult<StoreSource> {
    match (config.target(), host_store) {
        (Some(StoreTarget::ConnectionString { url, database }), None) => {
            let connector = MongoConnector::new(SecretString::new(url.clone()))
                .with_database(database.clone());
            Ok(StoreSource::Connector(Arc::new(connector)))
        },
        (Some(StoreTarget::ConnectionString { .. }), Some(_)) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "conflicting_target"),
            "connectionString cannot be combined with a host-provided store",
        )),
        (Some(StoreTarget::Database { .. }) | None, Some(store)) => Ok(StoreSource::Ready(store)),
        (Some(StoreTarget::Database { database }), None) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "missing_target"),
            "databaseName requires a store supplied by the host",
        )
        .with_metadata("database", database.as_str())),
        (None, None) => Err(ErrorEnvelope::expected(
            ErrorCode::new("config", "missing_target"),
            "connectionString is required",
        )),
    }
}

/// Build a sink from config. Nothing connects until the first batch.
pub fn build_sink(
    config: &ValidatedSinkConfig,
    host_store: Option<Arc<dyn DocumentStorePort>>,
    logger: Option<Arc<dyn LoggerPort>>,
) -> InfraResult<LogSink> {
    let source = build_store_source(config, host_store)?;
    let options = build_sink_options(config);
    if let Some(logger) = logger.as_deref() {
        logger.debug(
            "sink.configured",
            "Sink assembled from configuration",
            Some(diagnostic_fields([
                ("collection", Value::from(options.target.base_name().as_str())),
                ("rollingInterval", Value::from(options.target.interval().as_str())),
                ("documentShape", Value::from(config.document_shape.as_str())),
                (
                    "lazyConnect",
                    Value::from(matches!(source, StoreSource::Connector(_))),
                ),
            ])),
        );
    }
    Ok(LogSink::new(source, options, logger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_config::parse_sink_config_json;
    use mongo_log_sink_domain::RollingInterval;
    use mongo_log_sink_shared::Result;
    use std::time::Duration;

    const FULL_CONFIG: &str = r#"{
        "connectionString": "mongodb://db:27017/logs",
        "collectionName": "app",
        "rollingInterval": "day",
        "expireTtlSeconds": 3600,
        "cappedCollection": { "maxSizeMb": 10, "maxDocuments": 100 },
        "excludeMessageTemplate": true,
        "insert": { "ordered": false, "bypassDocumentValidation": true },
        "dictionaryKeyCollision": "keepFirst"
    }"#;

    #[test]
    fn options_follow_config() -> Result<()> {
        let config = parse_sink_config_json(FULL_CONFIG)?;
        let options = build_sink_options(&config);

        assert_eq!(options.target.base_name().as_str(), "app");
        assert_eq!(options.target.interval(), RollingInterval::Day);
        assert_eq!(options.expire_ttl, Some(Duration::from_secs(3600)));
        assert_eq!(
            options.collection_options,
            Some(CreateCollectionOptions {
                capped: Some(CappedCollectionOptions {
                    max_size_bytes: 10 * 1024 * 1024,
                    max_documents: Some(100),
                }),
            })
        );
        assert!(!options.include_message_template);
        assert!(!options.insert.ordered);
        assert!(options.insert.bypass_document_validation);
        assert_eq!(options.key_collisions, KeyCollisionPolicy::KeepFirst);
        Ok(())
    }

    #[test]
    fn defaults_keep_template_and_order() -> Result<()> {
        let config = parse_sink_config_json(r#"{ "connectionString": "mongodb://db/logs" }"#)?;
        let options = build_sink_options(&config);

        assert_eq!(options.target.base_name().as_str(), "log");
        assert_eq!(options.collection_options, None);
        assert_eq!(options.expire_ttl, None);
        assert!(options.include_message_template);
        assert_eq!(options.insert, InsertManyOptions::default());
        assert_eq!(options.document_shape, DocumentShape::Structured);
        Ok(())
    }

    #[test]
    fn legacy_shape_is_carried_into_the_options() -> Result<()> {
        let config = parse_sink_config_json(
            r#"{ "connectionString": "mongodb://db/logs", "documentShape": "legacy" }"#,
        )?;
        let options = build_sink_options(&config);
        assert_eq!(options.document_shape, DocumentShape::Legacy);
        assert!(options.include_message_template);
        assert_eq!(options.expire_ttl, None);
        Ok(())
    }

    #[test]
    fn connection_string_builds_a_lazy_connector() -> Result<()> {
        let config = parse_sink_config_json(FULL_CONFIG)?;
        let source = build_store_source(&config, None)?;
        assert!(matches!(source, StoreSource::Connector(_)));
        Ok(())
    }

    #[test]
    fn database_name_without_host_store_is_rejected() -> Result<()> {
        let config = parse_sink_config_json(r#"{ "databaseName": "logs" }"#)?;
        let error = build_store_source(&config, None).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("config", "missing_target"))
        );
        Ok(())
    }
}
