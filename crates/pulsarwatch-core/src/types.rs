//! Domain types shared by the monitor, the state holder and the HTTP surface.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Overall health classification of the monitored cluster.
///
/// Variants are declared in ascending severity so `Ord` compares them
/// by how bad they are.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ClusterStatus {
    /// No evaluation has completed yet.
    #[default]
    Unknown,
    Ok,
    /// Some instances are offline but every tier still serves.
    Degraded,
    /// At least one tier cannot serve at all.
    TotalDown,
}

impl ClusterStatus {
    /// The worst category, the only one that escalates to an incident.
    pub fn is_worst(self) -> bool {
        self == ClusterStatus::TotalDown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClusterStatus::Unknown => "unknown",
            ClusterStatus::Ok => "ok",
            ClusterStatus::Degraded => "degraded",
            ClusterStatus::TotalDown => "total_down",
        }
    }
}

impl fmt::Display for ClusterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored Pulsar subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Coordination tier.
    Zookeeper,
    /// Storage tier.
    Bookkeeper,
    Broker,
    Proxy,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Zookeeper, Tier::Bookkeeper, Tier::Broker, Tier::Proxy];

    /// Stable lowercase name, also used as the metric subsystem.
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Zookeeper => "zookeeper",
            Tier::Bookkeeper => "bookkeeper",
            Tier::Broker => "broker",
            Tier::Proxy => "proxy",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one health evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub status: ClusterStatus,
    pub zookeeper_offline: u32,
    pub bookkeeper_offline: u32,
    pub broker_offline: u32,
    pub proxy_offline: u32,
}

impl Verdict {
    pub fn offline(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Zookeeper => self.zookeeper_offline,
            Tier::Bookkeeper => self.bookkeeper_offline,
            Tier::Broker => self.broker_offline,
            Tier::Proxy => self.proxy_offline,
        }
    }

    pub fn set_offline(&mut self, tier: Tier, count: u32) {
        match tier {
            Tier::Zookeeper => self.zookeeper_offline = count,
            Tier::Bookkeeper => self.bookkeeper_offline = count,
            Tier::Broker => self.broker_offline = count,
            Tier::Proxy => self.proxy_offline = count,
        }
    }
}

/// Incident escalation parameters, forwarded untouched to the incident
/// transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertPolicy {
    /// Maximum consecutive failures before escalating.
    pub ceiling: u32,
    pub moving_window_seconds: u64,
    /// Failures tolerated inside the moving window.
    pub ceiling_in_moving_window: u32,
}
