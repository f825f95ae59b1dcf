//! Metric handles keyed by semantic identity.
//!
//! Callers describe a metric by `(namespace, subsystem, name)` and a label
//! value; the registry creates and registers the backing Prometheus
//! collectors on first use and reuses them for the rest of the process.
//!
//! # Architecture
//!
//! ```text
//! MetricRegistry
//!   ├── gauges:    key → GaugeVec        (label: device)
//!   ├── summaries: key → SummaryVec      (name suffix: _hst)
//!   │     └── RollingSummary per label value
//!   │           └── TargetedStream × age buckets
//!   └── prometheus::Registry → render() for /metrics
//! ```

pub mod error;
pub mod identity;
pub mod quantile;
pub mod registry;
pub mod summary;

pub use error::{MetricsError, MetricsResult};
pub use identity::MetricIdentity;
pub use quantile::{Target, TargetedStream};
pub use registry::{DEVICE_LABEL, MetricRegistry};
pub use summary::{RollingSummary, SummaryConfig, SummaryVec};
