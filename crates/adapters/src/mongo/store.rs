//! `DocumentStorePort` over the official MongoDB driver.

use super::convert::{index_direction, to_bson_document};
use super::error::{MongoErrorContext, MongoTargetError, map_mongo_error};
use bson::{Document as BsonDocument, doc};
use futures_util::TryStreamExt;
use mongo_log_sink_domain::{CollectionName, DatabaseName, Document};
use mongo_log_sink_ports::{
    BoxFuture, CreateCollectionOptions, DocumentStoreConnector, DocumentStorePort, IndexInfo,
    IndexSpec, InsertManyOptions, StoreProviderInfo,
};
use mongo_log_sink_shared::{
    ErrorEnvelope, RequestContext, Result, SecretString, run_cancellable, timeout_with_context,
};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};
use std::sync::Arc;
use std::time::Duration;

/// Provider id reported by the MongoDB adapter.
pub const MONGO_PROVIDER_ID: &str = "mongodb";

/// Upper bound for parsing options, `mongodb+srv://` lookups included.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Document store backed by a MongoDB database handle.
#[derive(Debug, Clone)]
pub struct MongoDocumentStore {
    database: Database,
    provider: StoreProviderInfo,
}

impl MongoDocumentStore {
    /// Wrap an existing database handle (for hosts that already own a client).
    #[must_use]
    pub fn new(database: Database) -> Self {
        Self {
            database,
            provider: StoreProviderInfo {
                id: MONGO_PROVIDER_ID.into(),
                name: "MongoDB".into(),
            },
        }
    }

    /// The wrapped database handle.
    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.database
    }

    fn collection(&self, name: &CollectionName) -> Collection<BsonDocument> {
        self.database.collection(name.as_str())
    }
}

impl DocumentStorePort for MongoDocumentStore {
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
            let error_ctx = MongoErrorContext::database("list_collection_names");
            let mut action = self.database.list_collection_names();
            if let Some(name) = name_filter.as_ref() {
                action = action.filter(doc! { "name": name.as_str() });
            }
            let names = run_cancellable(&ctx, "list_collection_names", async {
                action
                    .await
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await?;

            names
                .into_iter()
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
            let error_ctx = MongoErrorContext::collection("create_collection", collection_name.as_str());
            let mut action = self.database.create_collection(collection_name.as_str());
            if let Some(capped) = options.capped {
                action = action.capped(true).size(capped.max_size_bytes);
                if let Some(max_documents) = capped.max_documents {
                    action = action.max(max_documents);
                }
            }
            run_cancellable(&ctx, "create_collection", async {
                action
                    .await
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await
        })
    }

    fn list_indexes(
        &self,
        ctx: &RequestContext,
        collection_name: CollectionName,
    ) -> BoxFuture<'_, Result<Vec<IndexInfo>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let error_ctx = MongoErrorContext::collection("list_indexes", collection_name.as_str());
            let collection = self.collection(&collection_name);
            let models: Vec<IndexModel> = run_cancellable(&ctx, "list_indexes", async {
                let cursor = collection
                    .list_indexes()
                    .await
                    .map_err(|error| map_mongo_error(&error, &error_ctx))?;
                cursor
                    .try_collect()
                    .await
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await?;

            Ok(models.into_iter().map(index_info).collect())
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
            let error_ctx = MongoErrorContext::collection("create_index", collection_name.as_str());
            let direction = if index.ascending { 1 } else { -1 };
            let options = IndexOptions::builder()
                .name(index.name.to_string())
                .expire_after(index.expire_after)
                .build();
            let mut keys = BsonDocument::new();
            keys.insert(index.field.to_string(), direction);
            let model = IndexModel::builder()
                .keys(keys)
                .options(options)
                .build();

            let collection = self.collection(&collection_name);
            run_cancellable(&ctx, "create_index", async {
                collection
                    .create_index(model)
                    .await
                    .map(|_| ())
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await
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
            let error_ctx = MongoErrorContext::collection("drop_index", collection_name.as_str());
            let collection = self.collection(&collection_name);
            run_cancellable(&ctx, "drop_index", async {
                collection
                    .drop_index(index_name.as_ref())
                    .await
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await
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
            if documents.is_empty() {
                return Err(ErrorEnvelope::invalid_argument(
                    "documents",
                    "insert_many requires at least one document",
                ));
            }
            let error_ctx = MongoErrorContext::collection("insert_many", collection_name.as_str());
            let documents: Vec<BsonDocument> = documents.into_iter().map(to_bson_document).collect();
            let collection = self.collection(&collection_name);
            run_cancellable(&ctx, "insert_many", async {
                collection
                    .insert_many(documents)
                    .ordered(options.ordered)
                    .bypass_document_validation(options.bypass_document_validation)
                    .await
                    .map(|result| result.inserted_ids.len())
                    .map_err(|error| map_mongo_error(&error, &error_ctx))
            })
            .await
        })
    }
}

fn index_info(model: IndexModel) -> IndexInfo {
    let keys = model
        .keys
        .iter()
        .map(|(field, direction)| (Box::from(field.as_str()), index_direction(direction)))
        .collect();
    let (name, expire_after) = model
        .options
        .map(|options| (options.name.unwrap_or_default(), options.expire_after))
        .unwrap_or_default();
    IndexInfo {
        name: name.into_boxed_str(),
        keys,
        expire_after,
    }
}

/// Connects to MongoDB from a connection string.
///
/// The database comes from the connection string path unless overridden
/// with [`MongoConnector::with_database`].
#[derive(Debug, Clone)]
pub struct MongoConnector {
    connection_string: SecretString,
    database: Option<DatabaseName>,
}

impl MongoConnector {
    /// Create a connector for `connection_string`.
    #[must_use]
    pub const fn new(connection_string: SecretString) -> Self {
        Self {
            connection_string,
            database: None,
        }
    }

    /// Use `database` instead of the connection string's default database.
    #[must_use]
    pub fn with_database(mut self, database: DatabaseName) -> Self {
        self.database = Some(database);
        self
    }

    async fn open(&self) -> Result<MongoDocumentStore> {
        let options = ClientOptions::parse(self.connection_string.expose())
            .await
            .map_err(|error| MongoTargetError::InvalidConnectionString {
                reason: error.kind.to_string(),
            })?;
        let database = match self.database.as_ref() {
            Some(database) => database.clone(),
            None => options
                .default_database
                .as_deref()
                .ok_or(MongoTargetError::MissingDatabase)
                .and_then(|name| {
                    DatabaseName::parse(name).map_err(|_| MongoTargetError::MissingDatabase)
                })?,
        };
        let client = Client::with_options(options)
            .map_err(|error| map_mongo_error(&error, &MongoErrorContext::database("connect")))?;
        Ok(MongoDocumentStore::new(client.database(database.as_str())))
    }
}

impl DocumentStoreConnector for MongoConnector {
    fn connect(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<Arc<dyn DocumentStorePort>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let store = timeout_with_context(&ctx, CONNECT_TIMEOUT, "connect", self.open()).await?;
            let store: Arc<dyn DocumentStorePort> = Arc::new(store);
            Ok(store)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_shared::ErrorCode;
    use std::time::Duration;

    #[tokio::test]
    async fn missing_database_is_reported_before_any_io() {
        let connector = MongoConnector::new(SecretString::new("mongodb://localhost:27017"));
        let error = connector
            .connect(&RequestContext::new_batch())
            .await
            .err()
            .map(|error| error.code);
        assert_eq!(error, Some(ErrorCode::new("store", "missing_database")));
    }

    #[tokio::test]
    async fn malformed_connection_string_is_rejected() {
        let connector = MongoConnector::new(SecretString::new("postgres://localhost/db"));
        let error = connector
            .connect(&RequestContext::new_batch())
            .await
            .err()
            .map(|error| error.code);
        assert_eq!(
            error,
            Some(ErrorCode::new("store", "invalid_connection_string"))
        );
    }

    #[tokio::test]
    async fn connecting_is_lazy_and_uses_the_path_database() -> Result<()> {
        let connector = MongoConnector::new(SecretString::new("mongodb://localhost:27017/logs"));
        let store = connector.open().await?;
        assert_eq!(store.database().name(), "logs");
        assert_eq!(store.provider().id.as_ref(), MONGO_PROVIDER_ID);

        let named = connector
            .with_database(DatabaseName::parse("audit")?)
            .open()
            .await?;
        assert_eq!(named.database().name(), "audit");
        Ok(())
    }

    #[tokio::test]
    async fn connector_hands_out_a_store_port() -> Result<()> {
        let connector = MongoConnector::new(SecretString::new("mongodb://localhost:27017/logs"));
        let store = connector.connect(&RequestContext::new_batch()).await?;
        assert_eq!(store.provider().id.as_ref(), MONGO_PROVIDER_ID);
        Ok(())
    }

    #[test]
    fn index_models_convert_to_index_info() {
        let model = IndexModel::builder()
            .keys(doc! { "UtcTimeStamp": 1 })
            .options(
                IndexOptions::builder()
                    .name("serilog_sink_expired_ttl".to_owned())
                    .expire_after(Duration::from_secs(3600))
                    .build(),
            )
            .build();

        let info = index_info(model);
        assert_eq!(info.name.as_ref(), "serilog_sink_expired_ttl");
        assert_eq!(info.keys, vec![(Box::from("UtcTimeStamp"), 1)]);
        assert_eq!(info.expire_after, Some(Duration::from_secs(3600)));
    }
}
