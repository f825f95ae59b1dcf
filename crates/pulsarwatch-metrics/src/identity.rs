//! Semantic metric identities.
//!
//! Names follow the Prometheus conventions: `namespace_subsystem_name`,
//! lowercase, underscores only.

use prometheus::Opts;

use pulsarwatch_core::Tier;

pub const FUNC_TOPIC_SUBSYSTEM: &str = "func_topic";
pub const PUBSUB_SUBSYSTEM: &str = "pubsub";
pub const WEBSOCKET_SUBSYSTEM: &str = "websocket";

/// Suffix of the rolling summary that accompanies a latency gauge.
const SUMMARY_SUFFIX: &str = "_hst";

/// Identifies one gauge (and, for latencies, its companion summary).
///
/// `help` is descriptive only and never part of the identity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricIdentity {
    pub namespace: String,
    pub subsystem: String,
    pub name: String,
    pub help: String,
}

impl MetricIdentity {
    pub fn new(
        namespace: impl Into<String>,
        subsystem: impl Into<String>,
        name: impl Into<String>,
        help: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            subsystem: subsystem.into(),
            name: name.into(),
            help: help.into(),
        }
    }

    /// Registry key; equal for any two descriptions of the same metric.
    pub fn key(&self) -> String {
        format!("{}-{}-{}", self.namespace, self.subsystem, self.name)
    }

    pub fn opts(&self) -> Opts {
        Opts::new(self.name.clone(), self.help.clone())
            .namespace(self.namespace.clone())
            .subsystem(self.subsystem.clone())
    }

    /// Fully-qualified exposition name.
    pub fn fq_name(&self) -> String {
        self.opts().fq_name()
    }

    /// Exposition name of the companion rolling summary.
    pub fn summary_fq_name(&self) -> String {
        format!("{}{}", self.fq_name(), SUMMARY_SUFFIX)
    }

    /// Tenant count reported by the Pulsar admin REST API.
    pub fn tenant_count() -> Self {
        Self::new("pulsar", "tenant", "size", "Pulsar rest api tenant counts")
    }

    pub fn site_latency() -> Self {
        Self::new(
            "kafkaesque",
            "webendpoint",
            "latency_ms",
            "kafkaesque website endpoint monitor and latency in ms",
        )
    }

    pub fn function_latency() -> Self {
        Self::new(
            "pulsar",
            "function",
            "latency_ms",
            "Pulsar function message latency in ms",
        )
    }

    pub fn message_latency(subsystem: &str, help: &str) -> Self {
        Self::new("pulsar", subsystem, "latency_ms", help)
    }

    /// Offline instance count for one cluster tier.
    pub fn offline_instances(tier: Tier) -> Self {
        Self::new(
            "k8s",
            tier.as_str(),
            "offline_instances",
            format!("Offline {tier} instances in the monitored Pulsar cluster"),
        )
    }

    /// Latency identity for a free-form traffic kind.
    ///
    /// Anything starting with `func_topic` is function topic traffic,
    /// `websocket` is websocket traffic, everything else is plain pub/sub.
    pub fn for_kind(kind: &str) -> Self {
        if kind.starts_with(FUNC_TOPIC_SUBSYSTEM) {
            return Self::message_latency(
                FUNC_TOPIC_SUBSYSTEM,
                "Pulsar function input output topic latency in ms",
            );
        }
        if kind == WEBSOCKET_SUBSYSTEM {
            return Self::message_latency(
                WEBSOCKET_SUBSYSTEM,
                "Pulsar websocket pubsub topic latency in ms",
            );
        }
        Self::message_latency(PUBSUB_SUBSYSTEM, "Pulsar pubsub message latency in ms")
    }
}
