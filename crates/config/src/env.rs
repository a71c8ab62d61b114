//! Environment variable parsing and env-to-config merging.
//!
//! This module keeps env parsing:
//! - strict (invalid values fail fast)
//! - safe (secret values are redacted in error metadata)

use crate::schema::{DictionaryKeyCollision, DocumentShape, SinkConfig, ValidatedSinkConfig};
use mongo_log_sink_domain::RollingInterval;
use mongo_log_sink_shared::{ErrorCode, ErrorEnvelope, REDACTED_VALUE, SecretString, is_secret_key};
use std::collections::BTreeMap;
use std::fmt;

/// Env var: connection string (secret).
pub const ENV_CONNECTION_STRING: &str = "MONGO_SINK_CONNECTION_STRING";
/// Env var: database name.
pub const ENV_DATABASE_NAME: &str = "MONGO_SINK_DATABASE_NAME";
/// Env var: base collection name.
pub const ENV_COLLECTION_NAME: &str = "MONGO_SINK_COLLECTION_NAME";
/// Env var: events per batch.
pub const ENV_BATCH_POSTING_LIMIT: &str = "MONGO_SINK_BATCH_POSTING_LIMIT";
/// Env var: batch period in milliseconds.
pub const ENV_BATCH_PERIOD_MS: &str = "MONGO_SINK_BATCH_PERIOD_MS";
/// Env var: capped collection size (MB); presence enables capping.
pub const ENV_CAPPED_MAX_SIZE_MB: &str = "MONGO_SINK_CAPPED_MAX_SIZE_MB";
/// Env var: capped collection document cap.
pub const ENV_CAPPED_MAX_DOCUMENTS: &str = "MONGO_SINK_CAPPED_MAX_DOCUMENTS";
/// Env var: TTL in seconds.
pub const ENV_EXPIRE_TTL_SECONDS: &str = "MONGO_SINK_EXPIRE_TTL_SECONDS";
/// Env var: rolling interval (name or `0..=5`).
pub const ENV_ROLLING_INTERVAL: &str = "MONGO_SINK_ROLLING_INTERVAL";
/// Env var: omit message templates.
pub const ENV_EXCLUDE_MESSAGE_TEMPLATE: &str = "MONGO_SINK_EXCLUDE_MESSAGE_TEMPLATE";
/// Env var: ordered inserts.
pub const ENV_INSERT_ORDERED: &str = "MONGO_SINK_INSERT_ORDERED";
/// Env var: bypass document validation.
pub const ENV_INSERT_BYPASS_VALIDATION: &str = "MONGO_SINK_INSERT_BYPASS_DOCUMENT_VALIDATION";
/// Env var: dictionary key collision policy.
pub const ENV_DICTIONARY_KEY_COLLISION: &str = "MONGO_SINK_DICTIONARY_KEY_COLLISION";
/// Env var: document shape (`structured` | `legacy`).
pub const ENV_DOCUMENT_SHAPE: &str = "MONGO_SINK_DOCUMENT_SHAPE";

const ALL_ENV_VARS: [&str; 14] = [
    ENV_CONNECTION_STRING,
    ENV_DATABASE_NAME,
    ENV_COLLECTION_NAME,
    ENV_BATCH_POSTING_LIMIT,
    ENV_BATCH_PERIOD_MS,
    ENV_CAPPED_MAX_SIZE_MB,
    ENV_CAPPED_MAX_DOCUMENTS,
    ENV_EXPIRE_TTL_SECONDS,
    ENV_ROLLING_INTERVAL,
    ENV_EXCLUDE_MESSAGE_TEMPLATE,
    ENV_INSERT_ORDERED,
    ENV_INSERT_BYPASS_VALIDATION,
    ENV_DICTIONARY_KEY_COLLISION,
    ENV_DOCUMENT_SHAPE,
];

/// Typed env-derived overrides for `SinkConfig`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkEnv {
    /// Override for `connectionString`.
    pub connection_string: Option<SecretString>,
    /// Override for `databaseName`.
    pub database_name: Option<Box<str>>,
    /// Override for `collectionName`.
    pub collection_name: Option<Box<str>>,
    /// Override for `batchPostingLimit`.
    pub batch_posting_limit: Option<u32>,
    /// Override for `batchPeriodMs`.
    pub batch_period_ms: Option<u64>,
    /// Override for `cappedCollection.maxSizeMb`.
    pub capped_max_size_mb: Option<u64>,
    /// Override for `cappedCollection.maxDocuments`.
    pub capped_max_documents: Option<u64>,
    /// Override for `expireTtlSeconds`.
    pub expire_ttl_seconds: Option<u64>,
    /// Override for `rollingInterval`.
    pub rolling_interval: Option<RollingInterval>,
    /// Override for `excludeMessageTemplate`.
    pub exclude_message_template: Option<bool>,
    /// Override for `insert.ordered`.
    pub insert_ordered: Option<bool>,
    /// Override for `insert.bypassDocumentValidation`.
    pub insert_bypass_document_validation: Option<bool>,
    /// Override for `dictionaryKeyCollision`.
    pub dictionary_key_collision: Option<DictionaryKeyCollision>,
    /// Override for `documentShape`.
    pub document_shape: Option<DocumentShape>,
}

impl SinkEnv {
    /// Parse env overrides from a key/value map (useful for tests and fixtures).
    pub fn from_map(map: &BTreeMap<String, String>) -> Result<Self, EnvParseError> {
        Ok(Self {
            connection_string: parse_optional_secret(map, ENV_CONNECTION_STRING)?,
            database_name: parse_optional_trimmed_string(map, ENV_DATABASE_NAME)?,
            collection_name: parse_optional_trimmed_string(map, ENV_COLLECTION_NAME)?,
            batch_posting_limit: parse_optional_u32(map, ENV_BATCH_POSTING_LIMIT)?,
            batch_period_ms: parse_optional_u64(map, ENV_BATCH_PERIOD_MS)?,
            capped_max_size_mb: parse_optional_u64(map, ENV_CAPPED_MAX_SIZE_MB)?,
            capped_max_documents: parse_optional_u64(map, ENV_CAPPED_MAX_DOCUMENTS)?,
            expire_ttl_seconds: parse_optional_u64(map, ENV_EXPIRE_TTL_SECONDS)?,
            rolling_interval: parse_optional_rolling_interval(map, ENV_ROLLING_INTERVAL)?,
            exclude_message_template: parse_optional_bool(map, ENV_EXCLUDE_MESSAGE_TEMPLATE)?,
            insert_ordered: parse_optional_bool(map, ENV_INSERT_ORDERED)?,
            insert_bypass_document_validation: parse_optional_bool(
                map,
                ENV_INSERT_BYPASS_VALIDATION,
            )?,
            dictionary_key_collision: parse_optional_collision(map, ENV_DICTIONARY_KEY_COLLISION)?,
            document_shape: parse_optional_shape(map, ENV_DOCUMENT_SHAPE)?,
        })
    }

    /// Parse env overrides from the current process environment.
    pub fn from_std_env() -> Result<Self, EnvParseError> {
        let mut map = BTreeMap::new();
        for name in ALL_ENV_VARS {
            if let Ok(value) = std::env::var(name) {
                map.insert(name.to_string(), value);
            }
        }

        Self::from_map(&map)
    }
}

/// Apply env overrides to a base config (env wins over file/default values).
pub fn apply_env_overrides(
    base: SinkConfig,
    env: &SinkEnv,
) -> Result<ValidatedSinkConfig, ErrorEnvelope> {
    let mut config = base;

    if let Some(secret) = &env.connection_string {
        config.connection_string = Some(secret.expose().into());
    }
    if let Some(name) = &env.database_name {
        config.database_name = Some(name.clone());
    }
    set_clone(&mut config.collection_name, env.collection_name.as_ref());
    set_copy(&mut config.batch_posting_limit, env.batch_posting_limit);
    set_copy(&mut config.batch_period_ms, env.batch_period_ms);
    set_copy(&mut config.expire_ttl_seconds, env.expire_ttl_seconds.map(Some));
    set_copy(&mut config.rolling_interval, env.rolling_interval);
    set_copy(
        &mut config.exclude_message_template,
        env.exclude_message_template,
    );
    set_copy(&mut config.insert.ordered, env.insert_ordered);
    set_copy(
        &mut config.insert.bypass_document_validation,
        env.insert_bypass_document_validation,
    );
    set_copy(
        &mut config.dictionary_key_collision,
        env.dictionary_key_collision,
    );
    set_copy(&mut config.document_shape, env.document_shape);

    if env.capped_max_size_mb.is_some() || env.capped_max_documents.is_some() {
        let capped = config.capped_collection.get_or_insert_with(Default::default);
        set_copy(&mut capped.max_size_mb, env.capped_max_size_mb);
        set_copy(&mut capped.max_documents, env.capped_max_documents.map(Some));
    }

    config.validate_and_normalize().map_err(Into::into)
}

fn set_copy<T: Copy>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn set_clone<T: Clone>(field: &mut T, value: Option<&T>) {
    if let Some(value) = value {
        field.clone_from(value);
    }
}

/// Validation failures when parsing env variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvParseError {
    /// An env var was present but empty after trimming.
    EmptyValue {
        /// Env var name.
        var: &'static str,
    },
    /// A secret env var was present but empty after trimming.
    EmptySecret {
        /// Env var name.
        var: &'static str,
    },
    /// Boolean env var had an invalid value.
    InvalidBool {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Integer env var had an invalid value.
    InvalidInt {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
    /// Enum env var had an invalid value.
    InvalidEnum {
        /// Env var name.
        var: &'static str,
        /// Raw input value.
        value: String,
    },
}

impl EnvParseError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::EmptyValue { .. } | Self::EmptySecret { .. } => {
                ErrorCode::new("config", "empty_env_var")
            },
            Self::InvalidBool { .. } => ErrorCode::new("config", "invalid_env_bool"),
            Self::InvalidInt { .. } => ErrorCode::new("config", "invalid_env_int"),
            Self::InvalidEnum { .. } => ErrorCode::new("config", "invalid_env_enum"),
        }
    }
}

impl fmt::Display for EnvParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyValue { var } | Self::EmptySecret { var } => {
                write!(formatter, "{var} must be non-empty")
            },
            Self::InvalidBool { var, .. } => write!(formatter, "{var} must be a boolean"),
            Self::InvalidInt { var, .. } => write!(formatter, "{var} must be an integer"),
            Self::InvalidEnum { var, .. } => write!(formatter, "{var} has an unsupported value"),
        }
    }
}

impl std::error::Error for EnvParseError {}

impl From<EnvParseError> for ErrorEnvelope {
    fn from(error: EnvParseError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            EnvParseError::EmptyValue { var } | EnvParseError::EmptySecret { var } => {
                envelope = envelope.with_metadata("env_var", var);
            },
            EnvParseError::InvalidBool { var, value }
            | EnvParseError::InvalidInt { var, value }
            | EnvParseError::InvalidEnum { var, value } => {
                envelope = envelope
                    .with_metadata("env_var", var)
                    .with_metadata("value", redact_value(var, &value));
            },
        }

        envelope
    }
}

fn parse_optional_trimmed_string(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<Box<str>>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    Ok(Some(trimmed.to_owned().into_boxed_str()))
}

fn parse_optional_secret(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<SecretString>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptySecret { var });
    }

    Ok(Some(SecretString::new(trimmed.to_owned())))
}

fn parse_optional_u64(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u64>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_u32(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<u32>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    trimmed
        .parse::<u32>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidInt {
            var,
            value: raw.clone(),
        })
}

fn parse_optional_bool(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<bool>, EnvParseError> {
    let Some(raw) = map.get(var) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvParseError::EmptyValue { var });
    }

    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(EnvParseError::InvalidBool {
            var,
            value: raw.clone(),
        }),
    }
}

fn parse_optional_rolling_interval(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<RollingInterval>, EnvParseError> {
    let Some(raw) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };
    raw.parse::<RollingInterval>()
        .map(Some)
        .map_err(|_| EnvParseError::InvalidEnum {
            var,
            value: raw.into_string(),
        })
}

fn parse_optional_collision(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<DictionaryKeyCollision>, EnvParseError> {
    let Some(raw) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };
    DictionaryKeyCollision::parse(&raw)
        .map(Some)
        .ok_or_else(|| EnvParseError::InvalidEnum {
            var,
            value: raw.into_string(),
        })
}

fn parse_optional_shape(
    map: &BTreeMap<String, String>,
    var: &'static str,
) -> Result<Option<DocumentShape>, EnvParseError> {
    let Some(raw) = parse_optional_trimmed_string(map, var)? else {
        return Ok(None);
    };
    DocumentShape::parse(&raw)
        .map(Some)
        .ok_or_else(|| EnvParseError::InvalidEnum {
            var,
            value: raw.into_string(),
        })
}

fn redact_value(var: &str, value: &str) -> String {
    if is_secret_key(var) {
        REDACTED_VALUE.to_string()
    } else {
        value.to_string()
    }
}
