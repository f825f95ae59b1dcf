//! Cluster client seam and the bundled file-backed client.
//!
//! Pod discovery against the orchestrator lives outside this crate. The
//! file client consumes a JSON status document that an external agent
//! keeps up to date:
//!
//! ```json
//! {
//!   "namespace": "pulsar",
//!   "desired": { "zookeeper": 3, "bookkeeper": 3, "broker": 3, "proxy": 2 },
//!   "ready":   { "zookeeper": 3, "bookkeeper": 3, "broker": 2, "proxy": 2 }
//! }
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pulsarwatch_core::{ClusterStatus, ReplicaCounts, Verdict};

use crate::error::ClientError;
use crate::evaluate::evaluate_replicas;

/// Source of cluster state for the health monitor.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Refresh desired replica counts for every tier.
    async fn refresh_replicas(&self) -> Result<(), ClientError>;

    /// Refresh ready pod counts in `namespace`.
    async fn watch_pods(&self, namespace: &str) -> Result<(), ClientError>;

    /// Classify the cluster from the last refreshed counts.
    fn evaluate_health(&self) -> (String, Verdict);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodStatusDocument {
    pub namespace: String,
    /// Overrides the configured replica counts when present.
    #[serde(default)]
    pub desired: Option<ReplicaCounts>,
    #[serde(default)]
    pub ready: ReplicaCounts,
}

#[derive(Debug, Default)]
struct Observed {
    desired: Option<ReplicaCounts>,
    ready: Option<ReplicaCounts>,
}

pub struct FileClusterClient {
    path: PathBuf,
    configured: ReplicaCounts,
    observed: Mutex<Observed>,
}

impl FileClusterClient {
    pub fn new(path: impl Into<PathBuf>, configured: ReplicaCounts) -> Self {
        Self {
            path: path.into(),
            configured,
            observed: Mutex::new(Observed::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<PodStatusDocument, ClientError> {
        let content = tokio::fs::read(&self.path)
            .await
            .map_err(|source| ClientError::Read {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_slice(&content).map_err(|source| ClientError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

#[async_trait]
impl ClusterClient for FileClusterClient {
    async fn refresh_replicas(&self) -> Result<(), ClientError> {
        let document = self.read_document().await?;
        let desired = document.desired.unwrap_or(self.configured);
        debug!(?desired, "replica counts refreshed");
        self.observed.lock().desired = Some(desired);
        Ok(())
    }

    async fn watch_pods(&self, namespace: &str) -> Result<(), ClientError> {
        let document = self.read_document().await?;
        if document.namespace != namespace {
            return Err(ClientError::NamespaceMismatch {
                expected: namespace.to_string(),
                found: document.namespace,
            });
        }
        debug!(%namespace, ready = ?document.ready, "pod counts refreshed");
        self.observed.lock().ready = Some(document.ready);
        Ok(())
    }

    fn evaluate_health(&self) -> (String, Verdict) {
        let observed = self.observed.lock();
        match (&observed.desired, &observed.ready) {
            (Some(desired), Some(ready)) => evaluate_replicas(desired, ready),
            _ => (
                "pod status has not been observed yet".to_string(),
                Verdict {
                    status: ClusterStatus::Unknown,
                    ..Verdict::default()
                },
            ),
        }
    }
}
