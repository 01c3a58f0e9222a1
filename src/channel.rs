//! Publication and resolution of trace contexts through the metadata store
//!
//! [`ContextChannel`] is the bridge between the in-process trace context and
//! the orchestration engine's metadata database: a completed unit of work
//! publishes its context once, downstream units resolve it by upstream id.

use crate::propagation::{CodecError, ContextCodec, TraceContext};
use crate::store::{ContextRecord, MetadataStore, StoreError};
use log::{debug, warn};
use thiserror::Error;

/// Context publication errors
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("no active span to publish a context for")]
    NoActiveSpan,
    #[error("unable to encode the trace context")]
    Codec(#[from] CodecError),
    #[error("unable to write to the metadata store")]
    Store(#[from] StoreError),
}

/// Trace-context handoff channel between units of work
///
/// Publication is idempotent per unit id; publishing again replaces the
/// previous record. Resolution failures of individual upstreams are logged
/// and skipped so that one corrupt record never takes down a step.
pub struct ContextChannel<S> {
    store: S,
}

impl<S: MetadataStore> ContextChannel<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Publishes the given context as the metadata record of `unit_id`
    pub async fn publish(&self, unit_id: &str, context: &TraceContext) -> Result<(), PublishError> {
        let record = ContextRecord::new(context.trace_id().to_hex(), ContextCodec::encode(context)?);
        self.store.put(unit_id, &record).await?;

        debug!(
            "Published trace context of unit '{}' (trace {})",
            unit_id, record.trace_id
        );

        Ok(())
    }

    /// Publishes the context of the currently active span for `unit_id`
    pub async fn publish_current(&self, unit_id: &str) -> Result<(), PublishError> {
        let context = TraceContext::of_active_span().ok_or(PublishError::NoActiveSpan)?;
        self.publish(unit_id, &context).await
    }

    /// Resolves the parent context of a unit of work from its upstreams
    ///
    /// Upstream order expresses priority: the first upstream with a usable
    /// record wins. Unreadable or malformed records are skipped with a
    /// warning, missing ones silently.
    pub async fn resolve(&self, upstream_ids: &[String]) -> Option<TraceContext> {
        for unit_id in upstream_ids {
            let record = match self.store.get(unit_id).await {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(error) => {
                    warn!(
                        "Unable to read the metadata record of upstream '{}': {}",
                        unit_id, error
                    );
                    continue;
                }
            };

            match ContextCodec::decode(&record.context) {
                Ok(context) => {
                    debug!(
                        "Resolved parent trace context from upstream '{}' (trace {})",
                        unit_id, record.trace_id
                    );
                    return Some(context);
                }
                Err(error) => {
                    warn!(
                        "Skipping malformed trace context published by upstream '{}': {}",
                        unit_id, error
                    );
                }
            }
        }

        debug!("No upstream published a usable trace context");
        None
    }
}
