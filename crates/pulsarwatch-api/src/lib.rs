//! HTTP surface of the pulsarwatch daemon.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/metrics` | Prometheus exposition of the metric registry |
//! | GET | `/healthz` | Last verdict; 503 while the cluster is totally down |
//! | GET | `/status` | Last verdict with the cluster scope label |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use pulsarwatch_metrics::MetricRegistry;
use pulsarwatch_state::HealthState;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub health: HealthState,
    pub metrics: Arc<MetricRegistry>,
    /// `{name}-in-cluster` of the monitored cluster.
    pub scope: String,
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/healthz", get(handlers::healthz))
        .route("/status", get(handlers::status))
        .with_state(state)
}
