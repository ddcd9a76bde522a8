//! cache_partitions tool implementation.
//!
//! Lists every partition in the store, including stale ones that the next
//! activation would delete.

use crate::tools::json_result;
use mapcache_core::{CacheDb, PartitionInfo};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Output from the cache_partitions tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CachePartitionsOutput {
    pub partitions: Vec<PartitionInfo>,
    pub total_entries: usize,
    pub total_bytes: u64,
}

pub async fn partitions_impl(cache: &CacheDb) -> Result<CallToolResult, McpError> {
    let partitions = cache.partition_infos().await?;
    let output = CachePartitionsOutput {
        total_entries: partitions.iter().map(|p| p.entries).sum(),
        total_bytes: partitions.iter().map(|p| p.bytes).sum(),
        partitions,
    };
    json_result(&output)
}
