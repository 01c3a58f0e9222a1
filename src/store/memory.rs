//! In-memory metadata store

use super::{ContextRecord, MetadataStore, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Metadata store backed by a process-local map
///
/// Stands in for the engine's database in tests and single-process pipeline
/// runs. Clones share the same underlying records.
#[derive(Clone, Debug, Default)]
pub struct MemoryMetadataStore {
    records: Arc<Mutex<HashMap<String, ContextRecord>>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn put(&self, unit_id: &str, record: &ContextRecord) -> StoreResult<()> {
        self.records
            .lock()
            .unwrap()
            .insert(unit_id.to_owned(), record.clone());

        Ok(())
    }

    async fn get(&self, unit_id: &str) -> StoreResult<Option<ContextRecord>> {
        Ok(self.records.lock().unwrap().get(unit_id).cloned())
    }
}
