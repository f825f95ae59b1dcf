pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, KubernetesConfig, ReplicaCounts, ServerConfig};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
