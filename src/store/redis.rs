//! Redis-backed metadata store

use super::{ContextRecord, MetadataStore, StoreResult};
use crate::keys;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{pipe, AsyncCommands, Client};
use std::collections::HashMap;

/// Metadata store backed by the pipeline's Redis database
///
/// Records are stored as hashes under `unit:<id>:telemetry.context` so they
/// stay queryable with the engine's own tooling. Writes go through an atomic
/// pipeline; a rewrite replaces all fields of the record.
#[derive(Clone)]
pub struct RedisMetadataStore {
    con: MultiplexedConnection,
}

impl RedisMetadataStore {
    /// Connects to the given Redis server URL
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let con = client.get_multiplexed_tokio_connection().await?;

        Ok(Self { con })
    }
}

#[async_trait]
impl MetadataStore for RedisMetadataStore {
    async fn put(&self, unit_id: &str, record: &ContextRecord) -> StoreResult<()> {
        let mut con = self.con.clone();

        pipe()
            .atomic()
            .hset_multiple(
                keys::unit::telemetry::context(unit_id),
                &[
                    ("traceID", record.trace_id.as_str()),
                    ("context", record.context.as_str()),
                    ("publishedAt", record.published_at.as_str()),
                ],
            )
            .query_async::<_, ()>(&mut con)
            .await?;

        Ok(())
    }

    async fn get(&self, unit_id: &str) -> StoreResult<Option<ContextRecord>> {
        let mut con = self.con.clone();

        let fields: HashMap<String, String> = con
            .hgetall(keys::unit::telemetry::context(unit_id))
            .await?;

        if fields.is_empty() {
            return Ok(None);
        }

        Ok(Some(ContextRecord {
            trace_id: fields.get("traceID").cloned().unwrap_or_default(),
            context: fields.get("context").cloned().unwrap_or_default(),
            published_at: fields.get("publishedAt").cloned().unwrap_or_default(),
        }))
    }
}
