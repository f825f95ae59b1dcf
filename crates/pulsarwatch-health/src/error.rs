//! Health monitor error types.

use std::path::PathBuf;

use thiserror::Error;

/// Failures reported by a `ClusterClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to read pod status {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse pod status {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("pod status is for namespace {found}, expected {expected}")]
    NamespaceMismatch { expected: String, found: String },

    #[error("cluster unavailable: {0}")]
    Unavailable(String),
}

/// Failures delivering an alert or incident transition.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("alert delivery failed: {0}")]
    Delivery(String),
}

/// Why a monitoring tick was skipped.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to refresh replica counts: {0}")]
    RefreshReplicas(#[source] ClientError),

    #[error("failed to watch pods in namespace {namespace}: {source}")]
    WatchPods {
        namespace: String,
        #[source]
        source: ClientError,
    },
}
