//! cache_purge tool implementation.
//!
//! Deletes a partition wholesale, or trims it to its newest `max_entries`.

use crate::tools::json_result;
use mapcache_core::{CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Parameters for the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeParams {
    /// Partition name, e.g. `tiles-v1`.
    pub partition: String,

    /// Keep only the newest N entries instead of deleting the partition.
    pub max_entries: Option<usize>,
}

/// Output from the cache_purge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePurgeOutput {
    pub partition: String,
    /// Number of entries deleted.
    pub deleted: u64,
    /// Whether the partition itself was removed.
    pub partition_deleted: bool,
}

/// Implementation of the cache_purge tool.
pub async fn purge_impl(cache: &CacheDb, params: CachePurgeParams) -> Result<CallToolResult, McpError> {
    let name = params.partition.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("partition cannot be empty".to_string()).into());
    }
    if cache.find_partition(name).await?.is_none() {
        return Err(Error::UnknownPartition(name.to_string()).into());
    }

    let output = match params.max_entries {
        Some(max_entries) => {
            let deleted = cache.trim(name, max_entries).await?;
            CachePurgeOutput { partition: name.to_string(), deleted, partition_deleted: false }
        }
        None => {
            let entries = cache.partition_len(name).await?;
            let partition_deleted = cache.delete_partition(name).await?;
            CachePurgeOutput { partition: name.to_string(), deleted: entries as u64, partition_deleted }
        }
    };

    tracing::info!(partition = %output.partition, deleted = output.deleted, "purged partition");
    json_result(&output)
}
