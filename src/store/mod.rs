//! Durable metadata channel for cross-unit trace-context handoff
//!
//! The orchestration engine owns the store; this module models the handoff
//! as a minimal key-value interface ("publish once, read any number of
//! times") so the core stays independent of any particular backend and
//! testable with an in-memory fake.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod memory;
mod redis;

pub use self::memory::MemoryMetadataStore;
pub use self::redis::RedisMetadataStore;

/// Metadata access errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access the metadata store")]
    Redis(#[from] ::redis::RedisError),
}

/// Result shorthand
pub type StoreResult<T> = Result<T, StoreError>;

/// Published form of a trace context, attached as metadata to a completed
/// unit of work
///
/// Created once per unit-of-work completion and never mutated afterwards;
/// republishing replaces the whole record. Its lifetime is bound to the
/// engine's own metadata retention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    /// Trace id in hex, for direct lookup in the observability backend
    pub trace_id: String,
    /// Encoded trace-context carrier
    pub context: String,
    /// RFC 3339 publication timestamp
    pub published_at: String,
}

impl ContextRecord {
    /// Creates a record for the given encoded carrier, stamped with the current time
    pub fn new(trace_id: String, context: String) -> Self {
        Self {
            trace_id,
            context,
            published_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Store that durably associates a [`ContextRecord`] with a unit of work
///
/// `put` under an existing unit id overwrites the previous record, never
/// duplicates it. Concurrency safety is the backing store's responsibility.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn put(&self, unit_id: &str, record: &ContextRecord) -> StoreResult<()>;
    async fn get(&self, unit_id: &str) -> StoreResult<Option<ContextRecord>>;
}
