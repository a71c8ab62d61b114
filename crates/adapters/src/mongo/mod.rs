//! MongoDB document store adapter.

mod convert;
mod error;
mod store;

pub use convert::{index_direction, to_bson_document, to_bson_value};
pub use error::{MongoErrorContext, MongoTargetError, map_mongo_error, map_server_failure};
pub use store::{MONGO_PROVIDER_ID, MongoConnector, MongoDocumentStore};
