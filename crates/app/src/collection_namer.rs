//! Clock-driven collection naming for rolling targets.

use mongo_log_sink_domain::{CollectionName, RollingInterval, RollingTarget};
use mongo_log_sink_ports::ClockPort;
use mongo_log_sink_shared::{ErrorEnvelope, Result};
use std::sync::Arc;

pub use mongo_log_sink_domain::resolve_collection_name as resolve;

/// Resolves the physical collection of a rolling target at the clock's "now".
#[derive(Clone)]
pub struct CollectionNamer {
    target: RollingTarget,
    clock: Arc<dyn ClockPort>,
}

impl CollectionNamer {
    /// Create a namer.
    #[must_use]
    pub fn new(target: RollingTarget, clock: Arc<dyn ClockPort>) -> Self {
        Self { target, clock }
    }

    /// The logical target.
    #[must_use]
    pub const fn target(&self) -> &RollingTarget {
        &self.target
    }

    /// Collection for the current instant.
    pub fn current(&self) -> Result<CollectionName> {
        self.target
            .resolve(self.clock.now_utc())
            .map_err(ErrorEnvelope::from)
    }

    /// Resolve a rolling interval from its numeric code.
    pub fn interval_from_code(code: u8) -> Result<RollingInterval> {
        RollingInterval::from_code(code).map_err(ErrorEnvelope::from)
    }
}

impl std::fmt::Debug for CollectionNamer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CollectionNamer")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
