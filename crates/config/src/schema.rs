//! Sink configuration schema, defaults, validation, and normalization.
//!
//! - Deserialization uses `serde` (JSON or TOML).
//! - Validation is manual and returns typed errors mapped to `ErrorEnvelope`.
//! - Normalization trims string fields and drops empty optionals.

use mongo_log_sink_domain::{CollectionName, DatabaseName, RollingInterval};
use mongo_log_sink_shared::{BoundedU32, BoundedU64, ErrorCode, ErrorEnvelope, REDACTED_VALUE};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Strips credentials from a connection string for error messages.
///
/// Multi-host seed lists are not valid `url` hosts, so the userinfo section
/// is cut by hand when parsing fails.
pub(crate) fn sanitize_url_for_error(url: &str) -> String {
    if let Ok(mut parsed) = Url::parse(url) {
        if parsed.password().is_some() || !parsed.username().is_empty() {
            if parsed.set_username("").is_err() {
                return "[invalid url: invalid username]".to_string();
            }
            if parsed.set_password(None).is_err() {
                return "[invalid url: invalid password]".to_string();
            }
        }
        return parsed.to_string();
    }

    let Some((scheme, rest)) = url.split_once("://") else {
        return "[invalid url: missing scheme]".to_string();
    };
    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    match authority.rsplit_once('@') {
        Some((_, hosts)) => format!("{scheme}://{REDACTED_VALUE}@{hosts}{tail}"),
        None => url.to_string(),
    }
}

/// Current supported configuration schema version.
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Default collection name.
pub const DEFAULT_COLLECTION_NAME: &str = "log";
/// Default number of events per batch.
pub const DEFAULT_BATCH_POSTING_LIMIT: u32 = 50;
/// Default batch period (ms).
pub const DEFAULT_BATCH_PERIOD_MS: u64 = 2_000;
/// Default capped collection size (MB).
pub const DEFAULT_CAPPED_MAX_SIZE_MB: u64 = 50;

const BATCH_POSTING_LIMIT_MIN: u32 = 1;
const BATCH_POSTING_LIMIT_MAX: u32 = 100_000;
const BATCH_PERIOD_MIN_MS: u64 = 1;
const BATCH_PERIOD_MAX_MS: u64 = 3_600_000;
const CAPPED_MAX_SIZE_MIN_MB: u64 = 1;
const CAPPED_MAX_SIZE_MAX_MB: u64 = 1_048_576;
const CAPPED_MAX_DOCUMENTS_MIN: u64 = 1;
const CAPPED_MAX_DOCUMENTS_MAX: u64 = 1_000_000_000_000;
const EXPIRE_TTL_MIN_SECONDS: u64 = 1;
const EXPIRE_TTL_MAX_SECONDS: u64 = 2_147_483_647;

const BYTES_PER_MB: u64 = 1024 * 1024;

const CONNECTION_STRING_SCHEMES: [&str; 2] = ["mongodb://", "mongodb+srv://"];

/// Top-level sink configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SinkConfig {
    /// Schema version for forward-compatible migrations.
    pub version: u32,
    /// `mongodb://` connection string; must name a database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_string: Option<Box<str>>,
    /// Database name, for hosts that hand the sink a ready client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_name: Option<Box<str>>,
    /// Base collection name.
    pub collection_name: Box<str>,
    /// Maximum number of events per batch.
    pub batch_posting_limit: u32,
    /// Time between batches (ms).
    pub batch_period_ms: u64,
    /// Create the collection as capped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capped_collection: Option<CappedCollectionConfig>,
    /// Expire documents this many seconds after their timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expire_ttl_seconds: Option<u64>,
    /// Collection rolling policy.
    #[schemars(with = "String")]
    pub rolling_interval: RollingInterval,
    /// Omit `MessageTemplate` from stored documents.
    pub exclude_message_template: bool,
    /// Bulk insert options.
    pub insert: InsertConfig,
    /// Which value wins when two dictionary keys sanitize to the same name.
    pub dictionary_key_collision: DictionaryKeyCollision,
    /// Layout of stored documents.
    pub document_shape: DocumentShape,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            connection_string: None,
            database_name: None,
            collection_name: DEFAULT_COLLECTION_NAME.into(),
            batch_posting_limit: DEFAULT_BATCH_POSTING_LIMIT,
            batch_period_ms: DEFAULT_BATCH_PERIOD_MS,
            capped_collection: None,
            expire_ttl_seconds: None,
            rolling_interval: RollingInterval::None,
            exclude_message_template: false,
            insert: InsertConfig::default(),
            dictionary_key_collision: DictionaryKeyCollision::KeepLast,
            document_shape: DocumentShape::Structured,
        }
    }
}

impl SinkConfig {
    /// Validate and normalize the config.
    pub fn validate_and_normalize(mut self) -> Result<ValidatedSinkConfig, ConfigSchemaError> {
        self.validate_version()?;
        self.normalize();

        let collection_name = CollectionName::parse(&self.collection_name).map_err(|error| {
            ConfigSchemaError::InvalidName {
                section: "sink",
                field: "collectionName",
                reason: error.to_string(),
            }
        })?;
        let target = self.validate_target()?;
        self.validate_shape()?;
        let limits = ConfigLimits::new(&self)?;

        Ok(ValidatedSinkConfig {
            raw: self,
            limits,
            collection_name,
            target,
        })
    }

    const fn validate_version(&self) -> Result<(), ConfigSchemaError> {
        if self.version != CURRENT_CONFIG_VERSION {
            return Err(ConfigSchemaError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_CONFIG_VERSION,
            });
        }
        Ok(())
    }

    fn normalize(&mut self) {
        normalize_optional_trimmed(&mut self.connection_string);
        normalize_optional_trimmed(&mut self.database_name);
        normalize_boxed_str(&mut self.collection_name);
    }

    fn validate_target(&self) -> Result<Option<StoreTarget>, ConfigSchemaError> {
        match (
            self.connection_string.as_deref(),
            self.database_name.as_deref(),
        ) {
            (Some(_), Some(_)) => Err(ConfigSchemaError::ConflictingTarget),
            (Some(url), None) => {
                let database = database_from_connection_string(url)?;
                Ok(Some(StoreTarget::ConnectionString {
                    url: url.into(),
                    database,
                }))
            },
            (None, Some(name)) => {
                let database =
                    DatabaseName::parse(name).map_err(|error| ConfigSchemaError::InvalidName {
                        section: "sink",
                        field: "databaseName",
                        reason: error.to_string(),
                    })?;
                Ok(Some(StoreTarget::Database { database }))
            },
            (None, None) => Ok(None),
        }
    }
}

impl SinkConfig {
    const fn validate_shape(&self) -> Result<(), ConfigSchemaError> {
        if !matches!(self.document_shape, DocumentShape::Legacy) {
            return Ok(());
        }
        if self.expire_ttl_seconds.is_some() {
            return Err(ConfigSchemaError::UnsupportedWithLegacy {
                field: "expireTtlSeconds",
            });
        }
        if self.exclude_message_template {
            return Err(ConfigSchemaError::UnsupportedWithLegacy {
                field: "excludeMessageTemplate",
            });
        }
        Ok(())
    }
}

/// Capped collection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct CappedCollectionConfig {
    /// Maximum collection size (MB).
    pub max_size_mb: u64,
    /// Optional maximum number of documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_documents: Option<u64>,
}

impl Default for CappedCollectionConfig {
    fn default() -> Self {
        Self {
            max_size_mb: DEFAULT_CAPPED_MAX_SIZE_MB,
            max_documents: None,
        }
    }
}

/// Bulk insert pass-through options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct InsertConfig {
    /// Stop at the first failing document.
    pub ordered: bool,
    /// Skip server-side document validation.
    pub bypass_document_validation: bool,
}

impl Default for InsertConfig {
    fn default() -> Self {
        Self {
            ordered: true,
            bypass_document_validation: false,
        }
    }
}

/// Policy for dictionary keys that collide after sanitization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DictionaryKeyCollision {
    /// Later entries replace earlier ones in place.
    #[default]
    KeepLast,
    /// The first entry wins; later ones are dropped.
    KeepFirst,
}

impl DictionaryKeyCollision {
    /// Stable config name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::KeepLast => "keepLast",
            Self::KeepFirst => "keepFirst",
        }
    }

    /// Parse a config name (case-insensitive).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "keeplast" | "keep-last" | "keep_last" => Some(Self::KeepLast),
            "keepfirst" | "keep-first" | "keep_first" => Some(Self::KeepFirst),
            _ => None,
        }
    }
}

impl fmt::Display for DictionaryKeyCollision {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Layout of stored documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DocumentShape {
    /// Typed fields: `UtcTimeStamp`, `Properties`, structured `Exception`.
    #[default]
    Structured,
    /// JSON-formatter layout written by older sink versions.
    Legacy,
}

impl DocumentShape {
    /// Stable config name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structured => "structured",
            Self::Legacy => "legacy",
        }
    }

    /// Parse a config name (case-insensitive).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "structured" | "bson" => Some(Self::Structured),
            "legacy" | "json" => Some(Self::Legacy),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentShape {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Where the sink's documents live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreTarget {
    /// Connect with a connection string; the database comes from its path.
    ConnectionString {
        /// Raw connection string (may carry credentials).
        url: Box<str>,
        /// Database named in the connection string.
        database: DatabaseName,
    },
    /// Use a database on a client the host already owns.
    Database {
        /// Database name.
        database: DatabaseName,
    },
}

impl StoreTarget {
    /// Target database.
    #[must_use]
    pub const fn database(&self) -> &DatabaseName {
        match self {
            Self::ConnectionString { database, .. } | Self::Database { database } => database,
        }
    }
}

/// Validated config wrapper carrying bounded numeric values.
#[derive(Debug, Clone)]
pub struct ValidatedSinkConfig {
    raw: SinkConfig,
    limits: ConfigLimits,
    collection_name: CollectionName,
    target: Option<StoreTarget>,
}

impl ValidatedSinkConfig {
    /// Access validated numeric bounds.
    #[must_use]
    pub const fn limits(&self) -> &ConfigLimits {
        &self.limits
    }

    /// Borrow the raw config.
    #[must_use]
    pub const fn as_ref(&self) -> &SinkConfig {
        &self.raw
    }

    /// Consume the wrapper and return the raw config.
    #[must_use]
    pub fn into_inner(self) -> SinkConfig {
        self.raw
    }

    /// Validated base collection name.
    #[must_use]
    pub const fn collection_name(&self) -> &CollectionName {
        &self.collection_name
    }

    /// Configured store target, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&StoreTarget> {
        self.target.as_ref()
    }

    /// Require a connection string target.
    pub fn require_connection_string(&self) -> Result<(&str, &DatabaseName), ConfigSchemaError> {
        match &self.target {
            Some(StoreTarget::ConnectionString { url, database }) => Ok((url, database)),
            _ => Err(ConfigSchemaError::MissingTarget {
                field: "connectionString",
            }),
        }
    }

    /// TTL for the expiry index, if configured.
    #[must_use]
    pub fn expire_ttl(&self) -> Option<Duration> {
        self.limits
            .expire_ttl_seconds
            .map(|seconds| Duration::from_secs(seconds.get()))
    }

    /// Capped collection size in bytes and optional document cap.
    #[must_use]
    pub fn capped_limits(&self) -> Option<(u64, Option<u64>)> {
        self.limits.capped_max_size_mb.map(|size_mb| {
            (
                size_mb.get().saturating_mul(BYTES_PER_MB),
                self.limits.capped_max_documents.map(BoundedU64::get),
            )
        })
    }
}

impl AsRef<SinkConfig> for ValidatedSinkConfig {
    fn as_ref(&self) -> &SinkConfig {
        &self.raw
    }
}

impl std::ops::Deref for ValidatedSinkConfig {
    type Target = SinkConfig;

    fn deref(&self) -> &Self::Target {
        &self.raw
    }
}

/// Validated numeric limits derived from the config.
#[derive(Debug, Clone, Copy)]
pub struct ConfigLimits {
    /// Events per batch.
    pub batch_posting_limit: BoundedU32<BATCH_POSTING_LIMIT_MIN, BATCH_POSTING_LIMIT_MAX>,
    /// Batch period (ms).
    pub batch_period_ms: BoundedU64<BATCH_PERIOD_MIN_MS, BATCH_PERIOD_MAX_MS>,
    /// Capped collection size (MB).
    pub capped_max_size_mb: Option<BoundedU64<CAPPED_MAX_SIZE_MIN_MB, CAPPED_MAX_SIZE_MAX_MB>>,
    /// Capped collection document count.
    pub capped_max_documents:
        Option<BoundedU64<CAPPED_MAX_DOCUMENTS_MIN, CAPPED_MAX_DOCUMENTS_MAX>>,
    /// TTL (seconds).
    pub expire_ttl_seconds: Option<BoundedU64<EXPIRE_TTL_MIN_SECONDS, EXPIRE_TTL_MAX_SECONDS>>,
}

impl ConfigLimits {
    fn new(config: &SinkConfig) -> Result<Self, ConfigSchemaError> {
        let capped = config.capped_collection.as_ref();
        Ok(Self {
            batch_posting_limit: bounded_u32(
                "sink",
                "batchPostingLimit",
                config.batch_posting_limit,
                BATCH_POSTING_LIMIT_MIN,
                BATCH_POSTING_LIMIT_MAX,
            )?,
            batch_period_ms: bounded_u64(
                "sink",
                "batchPeriodMs",
                config.batch_period_ms,
                BATCH_PERIOD_MIN_MS,
                BATCH_PERIOD_MAX_MS,
            )?,
            capped_max_size_mb: bounded_opt_u64(
                "cappedCollection",
                "maxSizeMb",
                capped.map(|capped| capped.max_size_mb),
                CAPPED_MAX_SIZE_MIN_MB,
                CAPPED_MAX_SIZE_MAX_MB,
            )?,
            capped_max_documents: bounded_opt_u64(
                "cappedCollection",
                "maxDocuments",
                capped.and_then(|capped| capped.max_documents),
                CAPPED_MAX_DOCUMENTS_MIN,
                CAPPED_MAX_DOCUMENTS_MAX,
            )?,
            expire_ttl_seconds: bounded_opt_u64(
                "sink",
                "expireTtlSeconds",
                config.expire_ttl_seconds,
                EXPIRE_TTL_MIN_SECONDS,
                EXPIRE_TTL_MAX_SECONDS,
            )?,
        })
    }
}

/// Parse a sink config from a JSON string, applying validation and normalization.
pub fn parse_sink_config_json(input: &str) -> Result<ValidatedSinkConfig, ErrorEnvelope> {
    let config: SinkConfig = serde_json::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_json"),
            format!("invalid config JSON: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// Parse a sink config from a TOML string, applying validation and normalization.
pub fn parse_sink_config_toml(input: &str) -> Result<ValidatedSinkConfig, ErrorEnvelope> {
    let config: SinkConfig = toml::from_str(input).map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("config", "invalid_toml"),
            format!("invalid config TOML: {error}"),
        )
    })?;

    config.validate_and_normalize().map_err(Into::into)
}

/// JSON Schema for `SinkConfig`.
#[must_use]
pub fn sink_config_schema() -> schemars::Schema {
    schemars::schema_for!(SinkConfig)
}

/// Typed validation errors for the configuration schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSchemaError {
    /// The config version is not supported by this binary.
    UnsupportedVersion {
        /// Version found in the config.
        found: u32,
        /// Version supported by this crate.
        supported: u32,
    },
    /// A numeric limit is out of bounds.
    LimitOutOfRange {
        /// Schema section (e.g. `sink`).
        section: &'static str,
        /// Field name in the config file (e.g. `batchPostingLimit`).
        field: &'static str,
        /// Value provided.
        value: u64,
        /// Minimum allowed value.
        min: u64,
        /// Maximum allowed value.
        max: u64,
    },
    /// A connection string is malformed or names no database.
    InvalidUrl {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Invalid URL value (credentials stripped when surfaced).
        url: String,
        /// Human readable reason.
        reason: &'static str,
    },
    /// A collection or database name is invalid.
    InvalidName {
        /// Schema section.
        section: &'static str,
        /// Field name in the config file.
        field: &'static str,
        /// Human readable reason.
        reason: String,
    },
    /// Both `connectionString` and `databaseName` were set.
    ConflictingTarget,
    /// A required store target is missing.
    MissingTarget {
        /// Field that must be set.
        field: &'static str,
    },
    /// A setting that only applies to the structured document shape.
    UnsupportedWithLegacy {
        /// Offending field.
        field: &'static str,
    },
}

impl ConfigSchemaError {
    fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedVersion { .. } => ErrorCode::new("config", "unsupported_version"),
            Self::LimitOutOfRange { .. } => ErrorCode::new("config", "invalid_limit"),
            Self::InvalidUrl { .. } => ErrorCode::new("config", "invalid_url"),
            Self::InvalidName { .. } => ErrorCode::new("config", "invalid_name"),
            Self::ConflictingTarget => ErrorCode::new("config", "conflicting_target"),
            Self::MissingTarget { .. } => ErrorCode::new("config", "missing_target"),
            Self::UnsupportedWithLegacy { .. } => {
                ErrorCode::new("config", "unsupported_with_legacy")
            },
        }
    }
}

impl fmt::Display for ConfigSchemaError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVersion { found, supported } => {
                write!(
                    formatter,
                    "unsupported config version: {found} (supported: {supported})"
                )
            },
            Self::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => write!(
                formatter,
                "{section}.{field} must be within [{min}, {max}] (got {value})"
            ),
            Self::InvalidUrl {
                section,
                field,
                reason,
                ..
            } => write!(formatter, "invalid URL for {section}.{field}: {reason}"),
            Self::InvalidName {
                section,
                field,
                reason,
            } => write!(formatter, "invalid name for {section}.{field}: {reason}"),
            Self::ConflictingTarget => formatter
                .write_str("connectionString and databaseName are mutually exclusive"),
            Self::MissingTarget { field } => write!(formatter, "{field} is required"),
            Self::UnsupportedWithLegacy { field } => write!(
                formatter,
                "{field} is only supported with the structured document shape"
            ),
        }
    }
}

impl std::error::Error for ConfigSchemaError {}

impl From<ConfigSchemaError> for ErrorEnvelope {
    fn from(error: ConfigSchemaError) -> Self {
        let code = error.error_code();
        let message = error.to_string();
        let mut envelope = Self::expected(code, message);

        match error {
            ConfigSchemaError::UnsupportedVersion { found, supported } => {
                envelope = envelope
                    .with_metadata("found", found.to_string())
                    .with_metadata("supported", supported.to_string());
            },
            ConfigSchemaError::LimitOutOfRange {
                section,
                field,
                value,
                min,
                max,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("value", value.to_string())
                    .with_metadata("min", min.to_string())
                    .with_metadata("max", max.to_string());
            },
            ConfigSchemaError::InvalidUrl {
                section,
                field,
                url,
                reason,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("url", sanitize_url_for_error(&url))
                    .with_metadata("reason", reason);
            },
            ConfigSchemaError::InvalidName {
                section,
                field,
                reason,
            } => {
                envelope = envelope
                    .with_metadata("section", section)
                    .with_metadata("field", field)
                    .with_metadata("reason", reason);
            },
            ConfigSchemaError::ConflictingTarget => {},
            ConfigSchemaError::MissingTarget { field }
            | ConfigSchemaError::UnsupportedWithLegacy { field } => {
                envelope = envelope.with_metadata("field", field);
            },
        }

        envelope
    }
}

/// Extract and validate the database named in a `mongodb://` connection string.
fn database_from_connection_string(url: &str) -> Result<DatabaseName, ConfigSchemaError> {
    let invalid = |reason: &'static str| ConfigSchemaError::InvalidUrl {
        section: "sink",
        field: "connectionString",
        url: url.to_owned(),
        reason,
    };

    let rest = CONNECTION_STRING_SCHEMES
        .iter()
        .find_map(|scheme| url.strip_prefix(scheme))
        .ok_or_else(|| invalid("scheme must be mongodb:// or mongodb+srv://"))?;

    let (hosts, path) = rest
        .split_once('/')
        .ok_or_else(|| invalid("connection string must name a database"))?;
    if hosts.rsplit('@').next().is_none_or(str::is_empty) {
        return Err(invalid("connection string must name at least one host"));
    }

    let database = path.split('?').next().unwrap_or_default();
    if database.is_empty() {
        return Err(invalid("connection string must name a database"));
    }

    DatabaseName::parse(database).map_err(|_| invalid("database name in connection string is invalid"))
}

fn bounded_u32<const MIN: u32, const MAX: u32>(
    section: &'static str,
    field: &'static str,
    value: u32,
    min: u32,
    max: u32,
) -> Result<BoundedU32<MIN, MAX>, ConfigSchemaError> {
    BoundedU32::try_new(value).map_err(|_| ConfigSchemaError::LimitOutOfRange {
        section,
        field,
        value: u64::from(value),
        min: u64::from(min),
        max: u64::from(max),
    })
}

fn bounded_u64<const MIN: u64, const MAX: u64>(
    section: &'static str,
    field: &'static str,
    value: u64,
    min: u64,
    max: u64,
) -> Result<BoundedU64<MIN, MAX>, ConfigSchemaError> {
    BoundedU64::try_new(value).map_err(|_| ConfigSchemaError::LimitOutOfRange {
        section,
        field,
        value,
        min,
        max,
    })
}

fn bounded_opt_u64<const MIN: u64, const MAX: u64>(
    section: &'static str,
    field: &'static str,
    value: Option<u64>,
    min: u64,
    max: u64,
) -> Result<Option<BoundedU64<MIN, MAX>>, ConfigSchemaError> {
    value
        .map(|value| bounded_u64::<MIN, MAX>(section, field, value, min, max))
        .transpose()
}

fn normalize_optional_trimmed(value: &mut Option<Box<str>>) {
    let Some(raw) = value.take() else {
        return;
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    *value = Some(trimmed.into());
}

fn normalize_boxed_str(value: &mut Box<str>) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.into();
    }
}
