//! Lifecycle states, control messages and the install/activate steps.
//!
//! ```text
//! Installing -> Installed -> Activating -> Active
//! ```
//!
//! `Active` is terminal for a deployed version. A newer version supersedes
//! it by running its own lifecycle against the same store.

use crate::fetch::{CacheMode, Network};
use mapcache_core::{CacheDb, Error, Partition, Request};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Installing,
    Installed,
    Activating,
    Active,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages posted to the worker by a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Activate an installed worker without waiting for old clients to close.
    #[serde(rename = "SKIP_WAITING")]
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a JSON message such as `{"type":"SKIP_WAITING"}`.
    pub fn parse(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("unrecognized control message: {e}")))
    }
}

/// Outcome of precaching the app shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct PrecacheReport {
    pub stored: Vec<String>,
    pub skipped: Vec<String>,
}

/// Best-effort population of the static partition.
///
/// A file that fails to fetch, answers non-2xx, or cannot be written is
/// skipped; installation proceeds with whatever was stored.
pub async fn precache_app_shell(
    db: &CacheDb, network: &dyn Network, partition: &Partition, urls: &[Url],
) -> Result<PrecacheReport, Error> {
    if let Err(e) = db.open_partition(partition).await {
        tracing::warn!(partition = %partition.name, "could not open partition before precache: {e}");
    }

    let mut report = PrecacheReport::default();
    for url in urls {
        let request = Request::get(url.clone());
        let outcome = match network.fetch(&request, CacheMode::NoStore).await {
            Ok(response) if response.ok() => db.put(partition, &request.key(), &response).await,
            Ok(response) => Err(Error::Network(format!("status {}", response.status))),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => report.stored.push(url.to_string()),
            Err(e) => {
                tracing::warn!(url = %url, "app shell file skipped: {e}");
                report.skipped.push(url.to_string());
            }
        }
    }

    if let Err(e) = db.trim(&partition.name, partition.max_entries).await {
        tracing::warn!(partition = %partition.name, "trim after precache failed: {e}");
    }
    tracing::info!(
        partition = %partition.name,
        stored = report.stored.len(),
        skipped = report.skipped.len(),
        "precached app shell"
    );
    Ok(report)
}

/// Delete every partition whose name is not in `keep`. Returns the deleted names.
pub async fn collect_stale_partitions(db: &CacheDb, keep: &[String]) -> Result<Vec<String>, Error> {
    let mut deleted = Vec::new();
    for name in db.list_partition_names().await? {
        if keep.contains(&name) {
            continue;
        }
        if db.delete_partition(&name).await? {
            tracing::info!(partition = %name, "deleted stale partition");
            deleted.push(name);
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNetwork;
    use mapcache_core::{Category, Generation, PartitionLimits, Response};

    #[test]
    fn test_parse_skip_waiting() {
        assert_eq!(ControlMessage::parse(r#"{"type":"SKIP_WAITING"}"#).unwrap(), ControlMessage::SkipWaiting);
    }

    #[test]
    fn test_parse_unknown_message() {
        let err = ControlMessage::parse(r#"{"type":"CLAIM"}"#).unwrap_err();
        assert!(err.to_string().starts_with("INVALID_INPUT"));
        assert!(ControlMessage::parse("not json").is_err());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(LifecycleState::Activating.to_string(), "activating");
        assert_eq!(serde_json::to_string(&LifecycleState::Active).unwrap(), "\"active\"");
    }

    #[tokio::test]
    async fn test_precache_tolerates_missing_files() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:8000/index.html", Response::new(200, "<html>"));
        net.respond("http://localhost:8000/app.js", Response::new(200, "js"));
        net.fail("http://localhost:8000/style.css");

        let urls: Vec<Url> = ["index.html", "app.js", "style.css", "icons/icon-512.png"]
            .iter()
            .map(|p| Url::parse("http://localhost:8000/").unwrap().join(p).unwrap())
            .collect();
        let partition = Generation::new("v1", PartitionLimits::default()).partition(Category::Static).unwrap();

        let report = precache_app_shell(&db, &net, &partition, &urls).await.unwrap();
        assert_eq!(report.stored.len(), 2);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(db.partition_len(&partition.name).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_precache_survives_storage_failure() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let net = ScriptedNetwork::new();
        net.respond("http://localhost:8000/index.html", Response::new(200, "<html>"));
        let urls = vec![Url::parse("http://localhost:8000/index.html").unwrap()];
        let partition = Generation::new("v1", PartitionLimits::default()).partition(Category::Static).unwrap();
        db.clone().close().await.unwrap();

        let report = precache_app_shell(&db, &net, &partition, &urls).await.unwrap();
        assert!(report.stored.is_empty());
        assert_eq!(report.skipped, vec!["http://localhost:8000/index.html".to_string()]);
    }

    #[tokio::test]
    async fn test_collect_stale_partitions() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let old = Generation::new("v1", PartitionLimits::default());
        let new = Generation::new("v2", PartitionLimits::default());
        for p in old.partitions().iter().chain(new.partitions().iter()) {
            db.open_partition(p).await.unwrap();
        }

        let mut deleted = collect_stale_partitions(&db, &new.keep_set()).await.unwrap();
        deleted.sort();
        assert_eq!(deleted, vec!["data-v1", "static-v1", "tiles-v1"]);

        let mut left = db.list_partition_names().await.unwrap();
        left.sort();
        assert_eq!(left, vec!["data-v2", "static-v2", "tiles-v2"]);
    }
}
