//! kubescale.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::ResourceKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalerConfig {
    pub sweep: SweepConfig,
    pub custom: CustomResourceConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Seconds between sweeps.
    pub interval_secs: u64,
    /// Seconds to wait before the first sweep.
    pub startup_delay_secs: u64,
    /// Kinds visited on every sweep.
    pub kinds: Vec<ResourceKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomResourceConfig {
    /// Path of the integer replica field inside custom resource documents.
    pub replicas_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            startup_delay_secs: 10,
            kinds: ResourceKind::ALL.to_vec(),
        }
    }
}

impl Default for CustomResourceConfig {
    fn default() -> Self {
        Self {
            replicas_path: vec!["spec".to_string(), "replicas".to_string()],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8443,
            data_dir: PathBuf::from("/var/lib/kubescale"),
        }
    }
}

impl SweepConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_secs(self.startup_delay_secs)
    }
}

impl ScalerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ScalerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.sweep.interval_secs == 0 {
            anyhow::bail!("sweep.interval_secs must be positive");
        }
        if self.custom.replicas_path.is_empty() {
            anyhow::bail!("custom.replicas_path must not be empty");
        }
        Ok(())
    }
}
