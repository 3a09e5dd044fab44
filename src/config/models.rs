// src/config/models.rs
use crate::health::is_valid_component_name;
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

const MAX_TIMEOUT_MS: u64 = 5 * 60 * 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Deadline applied to every component check.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentConfig {
    Http {
        name: String,
        url: Url,
        #[serde(default)]
        expected_status: Option<u16>,
    },
    Tcp {
        name: String,
        address: String,
    },
}

impl ComponentConfig {
    pub fn name(&self) -> &str {
        match self {
            ComponentConfig::Http { name, .. } | ComponentConfig::Tcp { name, .. } => name,
        }
    }
}

impl HealthConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.health.timeout_ms > MAX_TIMEOUT_MS {
            bail!(
                "health.timeout_ms must be at most {} (got {})",
                MAX_TIMEOUT_MS,
                self.health.timeout_ms
            );
        }

        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            bail!("metrics.path must start with '/' (got {:?})", self.metrics.path);
        }

        let mut seen = HashSet::new();
        for component in &self.components {
            let name = component.name();
            if !is_valid_component_name(name) {
                bail!(
                    "component name {:?} may only use letters, digits, '-', '_', '.', ':' or '~'",
                    name
                );
            }
            if !seen.insert(name) {
                bail!("duplicate component name: {}", name);
            }
            if let ComponentConfig::Http {
                expected_status: Some(code),
                ..
            } = component
            {
                if !(100..=599).contains(code) {
                    bail!("component {}: invalid expected_status {}", name, code);
                }
            }
        }

        Ok(())
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
