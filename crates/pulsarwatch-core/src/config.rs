//! pulsarwatch.toml configuration parser.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{AlertPolicy, Tier};

/// Namespace the Pulsar workload is deployed into unless configured.
pub const DEFAULT_PULSAR_NAMESPACE: &str = "pulsar";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Cluster display name, used to build the scope label.
    pub name: String,
    #[serde(default)]
    pub kubernetes: KubernetesConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    pub enabled: bool,
    pub namespace: String,
    /// Pod status document maintained by an external agent.
    pub status_file: Option<PathBuf>,
    pub replicas: ReplicaCounts,
    pub alert_policy: AlertPolicy,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            namespace: DEFAULT_PULSAR_NAMESPACE.to_string(),
            status_file: None,
            replicas: ReplicaCounts::default(),
            alert_policy: AlertPolicy::default(),
        }
    }
}

/// Instance counts per tier. As desired replicas, zero means the tier is
/// not deployed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicaCounts {
    pub zookeeper: u32,
    pub bookkeeper: u32,
    pub broker: u32,
    pub proxy: u32,
}

impl ReplicaCounts {
    pub fn get(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Zookeeper => self.zookeeper,
            Tier::Bookkeeper => self.bookkeeper,
            Tier::Broker => self.broker,
            Tier::Proxy => self.proxy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8089)),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a TOML document.
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("name must not be empty".to_string()));
        }
        if self.kubernetes.enabled {
            if self.kubernetes.namespace.is_empty() {
                return Err(ConfigError::Invalid(
                    "kubernetes.namespace must not be empty".to_string(),
                ));
            }
            if self.kubernetes.replicas.broker == 0 {
                return Err(ConfigError::Invalid(
                    "kubernetes.replicas.broker must be at least 1 when monitoring is enabled"
                        .to_string(),
                ));
            }
            if self.kubernetes.status_file.is_none() {
                return Err(ConfigError::Invalid(
                    "kubernetes.status_file is required when monitoring is enabled".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Label identifying this cluster on metrics and incidents.
    pub fn scope_label(&self) -> String {
        format!("{}-in-cluster", self.name)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
