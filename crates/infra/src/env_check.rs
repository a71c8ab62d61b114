//! Environment validation helpers.

use mongo_log_sink_config::{SinkConfig, SinkEnv, apply_env_overrides};
use mongo_log_sink_shared::ErrorEnvelope;
use std::collections::BTreeMap;

/// Infra-level error type (shared error envelope).
pub type InfraError = ErrorEnvelope;

/// Infra-level result type.
pub type InfraResult<T> = Result<T, InfraError>;

/// Validate that the provided env overrides parse and merge into a valid config.
pub fn validate_env_parsing(env: &BTreeMap<String, String>) -> InfraResult<()> {
    let parsed = SinkEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    let _ = apply_env_overrides(SinkConfig::default(), &parsed)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_env_is_valid() {
        assert!(validate_env_parsing(&BTreeMap::new()).is_ok());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let env = BTreeMap::from([(
            "MONGO_SINK_BATCH_POSTING_LIMIT".to_owned(),
            "fifty".to_owned(),
        )]);
        assert!(validate_env_parsing(&env).is_err());
    }
}
