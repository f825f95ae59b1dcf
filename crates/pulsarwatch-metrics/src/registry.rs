//! Metric registry: lazily created, process-lifetime metric handles.
//!
//! Both maps are read-locked on the hot path. Creation takes the write lock
//! and re-checks the key, so concurrent first use of one identity creates
//! and registers exactly one collector.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, GaugeVec, Registry, TextEncoder};
use tracing::{debug, warn};

use crate::error::MetricsResult;
use crate::identity::MetricIdentity;
use crate::summary::{SummaryConfig, SummaryVec};

/// Label dimension every registry metric is partitioned by.
pub const DEVICE_LABEL: &str = "device";

pub struct MetricRegistry {
    registry: Registry,
    /// identity key → gauge.
    gauges: RwLock<HashMap<String, GaugeVec>>,
    /// identity key → latency summary.
    summaries: RwLock<HashMap<String, SummaryVec>>,
    summary_config: SummaryConfig,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Use an existing Prometheus registry as the backend.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            gauges: RwLock::new(HashMap::new()),
            summaries: RwLock::new(HashMap::new()),
            summary_config: SummaryConfig::default(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Set the gauge for `identity` under `label_value`.
    pub fn record_gauge(&self, identity: &MetricIdentity, label_value: &str, value: f64) {
        self.gauge(identity)
            .with_label_values(&[label_value])
            .set(value);
    }

    pub fn record_gauge_int(&self, identity: &MetricIdentity, label_value: &str, value: i64) {
        self.record_gauge(identity, label_value, value as f64);
    }

    /// Set the gauge to the latency in whole milliseconds and feed the same
    /// value into the rolling summary.
    pub fn record_latency(&self, identity: &MetricIdentity, label_value: &str, latency: Duration) {
        let ms = latency.as_millis() as f64;
        self.record_gauge(identity, label_value, ms);
        self.summary(identity).observe(&[label_value], ms);
    }

    pub fn gauge_count(&self) -> usize {
        self.gauges.read().len()
    }

    pub fn summary_count(&self) -> usize {
        self.summaries.read().len()
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> MetricsResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    fn gauge(&self, identity: &MetricIdentity) -> GaugeVec {
        let key = identity.key();
        if let Some(gauge) = self.gauges.read().get(&key) {
            return gauge.clone();
        }

        let mut gauges = self.gauges.write();
        gauges
            .entry(key)
            .or_insert_with_key(|key| self.create_gauge(key, identity))
            .clone()
    }

    fn summary(&self, identity: &MetricIdentity) -> SummaryVec {
        let key = identity.key();
        if let Some(summary) = self.summaries.read().get(&key) {
            return summary.clone();
        }

        let mut summaries = self.summaries.write();
        summaries
            .entry(key)
            .or_insert_with_key(|key| self.create_summary(key, identity))
            .clone()
    }

    /// A malformed identity is a programming error. A failed registration is
    /// logged and the unregistered handle is still used.
    fn create_gauge(&self, key: &str, identity: &MetricIdentity) -> GaugeVec {
        let gauge = GaugeVec::new(identity.opts(), &[DEVICE_LABEL])
            .unwrap_or_else(|e| panic!("invalid gauge identity {key}: {e}"));
        match self.registry.register(Box::new(gauge.clone())) {
            Ok(()) => debug!(%key, name = %identity.fq_name(), "gauge registered"),
            Err(e) => warn!(%key, error = %e, "gauge registration failed"),
        }
        gauge
    }

    /// Summaries must register; a conflict here is unrecoverable.
    fn create_summary(&self, key: &str, identity: &MetricIdentity) -> SummaryVec {
        let name = identity.summary_fq_name();
        let summary = SummaryVec::new(
            &name,
            &identity.help,
            &[DEVICE_LABEL],
            self.summary_config.clone(),
        )
        .and_then(|summary| {
            self.registry.register(Box::new(summary.clone()))?;
            Ok(summary)
        })
        .unwrap_or_else(|e| panic!("summary {name} registration failed: {e}"));
        debug!(%key, %name, "summary registered");
        summary
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}
