//! Request-scoped context: correlation ids and cancellation.
//!
//! A `RequestContext` is created by whoever drives a flush (one per batch)
//! and passed unchanged into every store call. Cancellation is cooperative:
//! calls that have not started fail fast, in-flight driver calls are raced
//! against the token.

use crate::{ErrorCode, ErrorEnvelope, Result};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// A correlation identifier used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(Arc<str>);

impl CorrelationId {
    /// Parse a correlation identifier. The value is trimmed; empty values are rejected.
    pub fn parse(value: impl AsRef<str>) -> Result<Self> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "correlationId must be non-empty",
            ));
        }
        Ok(Self(Arc::from(trimmed)))
    }

    /// Create a new batch id, unique within this process.
    #[must_use]
    pub fn new_batch_id() -> Self {
        let n = BATCH_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(Arc::from(format!("batch_{n}")))
    }

    /// Borrow the identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

static BATCH_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Request-scoped context passed across port boundaries.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: CorrelationId,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a context with a fresh cancellation token.
    #[must_use]
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self::with_cancellation(correlation_id, CancellationToken::new())
    }

    /// Create a context with an auto-generated `batch_*` id.
    #[must_use]
    pub fn new_batch() -> Self {
        Self::new(CorrelationId::new_batch_id())
    }

    /// Create a context sharing a caller-owned cancellation token.
    #[must_use]
    pub const fn with_cancellation(
        correlation_id: CorrelationId,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            correlation_id,
            cancellation,
        }
    }

    /// Return the correlation id.
    #[must_use]
    pub const fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Returns true if the request was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Cancel this request.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Await cancellation.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }

    /// Return a cancellation error when cancelled, tagged with the operation.
    pub fn ensure_not_cancelled(&self, operation: &'static str) -> Result<()> {
        if self.is_cancelled() {
            return Err(ErrorEnvelope::cancelled("operation cancelled")
                .with_metadata("operation", operation));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_rejects_blank() {
        assert!(CorrelationId::parse("   ").is_err());
        assert!(matches!(
            CorrelationId::parse(" batch_x "),
            Ok(id) if id.as_str() == "batch_x"
        ));
    }

    #[test]
    fn batch_ids_are_distinct() {
        let first = CorrelationId::new_batch_id();
        let second = CorrelationId::new_batch_id();
        assert_ne!(first, second);
        assert!(first.as_str().starts_with("batch_"));
    }

    #[test]
    fn shared_token_cancels_every_context() {
        let token = CancellationToken::new();
        let first = RequestContext::with_cancellation(CorrelationId::new_batch_id(), token.clone());
        let second = RequestContext::with_cancellation(CorrelationId::new_batch_id(), token);

        first.cancel();

        assert!(second.is_cancelled());
        let error = second.ensure_not_cancelled("emit_batch").err();
        assert!(error.as_ref().is_some_and(ErrorEnvelope::is_cancelled));
        assert_eq!(
            error.as_ref().and_then(|error| error.metadata_value("operation")),
            Some("emit_batch")
        );
    }

    #[tokio::test]
    async fn cancelled_future_resolves_after_cancel() {
        let ctx = RequestContext::new_batch();
        let waiter = ctx.clone();
        let handle = tokio::spawn(async move { waiter.cancelled().await });

        ctx.cancel();

        assert!(handle.await.is_ok());
    }
}
