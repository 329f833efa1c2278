//! Server configuration read from the environment

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::time::Duration;

pub const LISTEN_ADDR_VAR: &str = "TOPOLOGY_LISTEN_ADDR";
pub const ETCD_ENDPOINT_VAR: &str = "TOPOLOGY_ETCD_ENDPOINT";
pub const PD_ENDPOINT_VAR: &str = "TOPOLOGY_PD_ENDPOINT";
pub const TIMEOUT_SECS_VAR: &str = "TOPOLOGY_TIMEOUT_SECS";

/// Runtime configuration for topology-server
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Address the HTTP server binds to
    pub listen_addr: SocketAddr,
    /// Client URL of the etcd cluster holding TiDB registrations
    pub etcd_endpoint: String,
    /// Client URL of any PD member
    pub pd_endpoint: String,
    /// Deadline for each topology fetch or registration delete
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: ([0, 0, 0, 0], 12333).into(),
            etcd_endpoint: "http://127.0.0.1:2379".to_string(),
            pd_endpoint: "http://127.0.0.1:2379".to_string(),
            timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from `TOPOLOGY_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// unset variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(LISTEN_ADDR_VAR) {
            config.listen_addr = addr
                .parse()
                .with_context(|| format!("invalid {}: {}", LISTEN_ADDR_VAR, addr))?;
        }
        if let Some(endpoint) = lookup(ETCD_ENDPOINT_VAR) {
            config.etcd_endpoint = endpoint;
        }
        if let Some(endpoint) = lookup(PD_ENDPOINT_VAR) {
            config.pd_endpoint = endpoint;
        }
        if let Some(secs) = lookup(TIMEOUT_SECS_VAR) {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("invalid {}: {}", TIMEOUT_SECS_VAR, secs))?;
            if secs == 0 {
                anyhow::bail!("{} must be greater than zero", TIMEOUT_SECS_VAR);
            }
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}
