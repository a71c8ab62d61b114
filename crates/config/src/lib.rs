//! # mongo-log-sink-config
//!
//! Configuration schema, validation, and normalization logic for the sink.
//! This crate depends on `domain` and `shared` only.

/// Environment variable parsing and merging.
pub mod env;
/// Config loading helpers (env + file).
pub mod load;
/// Configuration schema types and helpers.
pub mod schema;

pub use schema::{
    CURRENT_CONFIG_VERSION, CappedCollectionConfig, ConfigLimits, ConfigSchemaError,
    DEFAULT_BATCH_PERIOD_MS, DEFAULT_BATCH_POSTING_LIMIT, DEFAULT_CAPPED_MAX_SIZE_MB,
    DEFAULT_COLLECTION_NAME, DictionaryKeyCollision, DocumentShape, InsertConfig, SinkConfig, StoreTarget,
    ValidatedSinkConfig, parse_sink_config_json, parse_sink_config_toml, sink_config_schema,
};

pub use env::{EnvParseError, SinkEnv, apply_env_overrides};
pub use load::{
    load_sink_config_from_path, load_sink_config_from_sources, load_sink_config_std_env,
    to_pretty_json, to_pretty_toml,
};

/// Returns the config crate version.
#[must_use]
pub const fn config_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
