//! Config loading helpers for hosts and tooling.

use crate::InfraResult;
use mongo_log_sink_config::{SinkEnv, ValidatedSinkConfig, load_sink_config_from_path, to_pretty_json};
use mongo_log_sink_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::path::Path;

/// Load and validate the config from an optional file plus env overrides.
pub fn load_validated_config(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
) -> InfraResult<ValidatedSinkConfig> {
    let env = SinkEnv::from_map(env).map_err(ErrorEnvelope::from)?;
    load_sink_config_from_path(config_path, &env)
}

/// Load and validate the effective config, returning deterministic pretty JSON.
///
/// Connection string credentials never reach the output.
pub fn load_effective_config_json(
    env: &BTreeMap<String, String>,
    config_path: Option<&Path>,
) -> InfraResult<String> {
    let config = load_validated_config(env, config_path)?;
    to_pretty_json(config.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_shared::Result;

    #[test]
    fn effective_config_hides_credentials() -> Result<()> {
        let env = BTreeMap::from([
            (
                "MONGO_SINK_CONNECTION_STRING".to_owned(),
                "mongodb://app:s3cret@db:27017/logs".to_owned(), // pragma: allowlist secret
            ),
            ("MONGO_SINK_ROLLING_INTERVAL".to_owned(), "day".to_owned()),
        ]);

        let json = load_effective_config_json(&env, None)?;

        assert!(!json.contains("s3cret"));
        assert!(json.contains("db:27017/logs"));
        assert!(json.contains("\"rollingInterval\": \"day\""));
        Ok(())
    }

    #[test]
    fn conflicting_targets_fail_validation() {
        let env = BTreeMap::from([
            (
                "MONGO_SINK_CONNECTION_STRING".to_owned(),
                "mongodb://db:27017/logs".to_owned(),
            ),
            ("MONGO_SINK_DATABASE_NAME".to_owned(), "logs".to_owned()),
        ]);

        let error = load_validated_config(&env, None).err();
        assert_eq!(
            error.map(|error| error.code.to_string()),
            Some("config:conflicting_target".to_owned())
        );
    }
}
