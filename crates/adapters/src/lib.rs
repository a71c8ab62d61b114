//! # mongo-log-sink-adapters
//!
//! Adapter implementations for ports (MongoDB document store, diagnostic
//! loggers).
//! This crate depends on `ports`, `domain`, and `shared`.

pub mod line_sink;
pub mod logger;
#[cfg(feature = "mongodb")]
pub mod mongo;
pub mod tracing_logger;

pub use line_sink::{LineSink, MemoryLineSink, StderrLineSink};
pub use logger::JsonLogger;
pub use tracing_logger::{TRACING_TARGET, TracingLogger};

#[cfg(feature = "mongodb")]
pub use mongo::{MONGO_PROVIDER_ID, MongoConnector, MongoDocumentStore};

/// Returns the adapters crate version.
#[must_use]
pub const fn adapters_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongo_log_sink_ports::ports_crate_version;
    use mongo_log_sink_shared::shared_crate_version;

    fn workspace_deps() -> Vec<String> {
        let cargo_toml = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"));
        let mut deps = Vec::new();
        let mut in_deps = false;

        for raw_line in cargo_toml.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('[') {
                in_deps = line == "[dependencies]" || line == "[dev-dependencies]";
                continue;
            }
            if in_deps && line.starts_with("mongo-log-sink-") {
                let key = line.split('=').next().unwrap_or("").trim();
                let name = key.split('.').next().unwrap_or("").trim();
                deps.push(name.to_string());
            }
        }

        deps
    }

    #[test]
    fn adapters_do_not_depend_on_app_or_infra() {
        let deps = workspace_deps();
        let forbidden = ["mongo-log-sink-app", "mongo-log-sink-infra"];

        for dep in &deps {
            assert!(
                !forbidden.contains(&dep.as_str()),
                "forbidden dependency found: {dep}"
            );
        }
    }

    #[test]
    fn adapters_crate_version_is_set() {
        assert!(!adapters_crate_version().is_empty());
        assert!(!ports_crate_version().is_empty());
        assert!(!shared_crate_version().is_empty());
    }
}
