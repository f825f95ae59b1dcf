//! In-cluster health monitoring for Pulsar.
//!
//! A single background task asks a `ClusterClient` for fresh replica and
//! pod counts every 10 seconds, classifies the cluster, publishes offline
//! instance gauges, and drives the incident state machine.
//!
//! # Architecture
//!
//! ```text
//! HealthMonitor (one task, cancellable via watch channel)
//!   ├── ClusterClient::refresh_replicas / watch_pods / evaluate_health
//!   ├── HealthState::set(status, offline brokers)
//!   ├── MetricRegistry::record_gauge × 4 tiers
//!   └── IncidentTracker → AlertSink
//!         ├── TotalDown: verbose alert + incident (3 min suppression)
//!         └── Ok: clear the open incident
//! ```
//!
//! Refresh failures skip the tick without touching state or alerts; the
//! next tick tries again.

pub mod alert;
pub mod client;
pub mod error;
pub mod evaluate;
pub mod monitor;

pub use alert::{AlertAction, AlertSink, IncidentReport, IncidentState, IncidentTracker, LogAlertSink};
pub use client::{ClusterClient, FileClusterClient, PodStatusDocument};
pub use error::{AlertError, ClientError, MonitorError};
pub use evaluate::evaluate_replicas;
pub use monitor::{HealthMonitor, MONITOR_INTERVAL, VERBOSE_ALERT_WINDOW};
