//! sw_status tool implementation.

use super::json_result;
use mapcache_client::{Worker, WorkerStatus};
use mapcache_core::PartitionInfo;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwStatusOutput {
    #[serde(flatten)]
    pub worker: WorkerStatus,
    /// Version recorded by the last completed activation.
    pub active_version: Option<String>,
    pub partitions: Vec<PartitionInfo>,
}

pub async fn status_impl(worker: &Worker) -> Result<CallToolResult, McpError> {
    let db = &worker.context().db;
    let output = SwStatusOutput {
        worker: worker.status(),
        active_version: db.active_version().await?,
        partitions: db.partition_infos().await?,
    };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{active_worker, output};
    use mapcache_client::LifecycleState;

    #[tokio::test]
    async fn test_status_after_start() {
        let (worker, _net) = active_worker().await;
        let out: SwStatusOutput = output(&status_impl(&worker).await.unwrap());

        assert_eq!(out.worker.state, LifecycleState::Active);
        assert_eq!(out.worker.version, "v1");
        assert!(out.worker.clients_claimed);
        assert_eq!(out.active_version.as_deref(), Some("v1"));

        let mut names: Vec<String> = out.partitions.into_iter().map(|p| p.name).collect();
        names.sort();
        assert_eq!(names, vec!["data-v1", "static-v1", "tiles-v1"]);
    }
}
