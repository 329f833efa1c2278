//! Cluster topology data model
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Liveness of a single component instance
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    #[default]
    Unknown,
    Up,
    Offline,
    Tombstone,
    Down,
}

/// A TiDB (SQL layer) instance registered in the coordination store
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiDBInfo {
    pub version: String,
    pub git_hash: String,
    pub ip: String,
    pub port: u16,
    pub status_port: u16,
    pub deploy_path: String,
    pub start_timestamp: i64,
    pub status: ComponentStatus,
}

/// A TiKV (storage) instance as reported by PD
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TiKVInfo {
    pub version: String,
    pub git_hash: String,
    pub ip: String,
    pub port: u16,
    pub status_port: u16,
    pub deploy_path: String,
    pub start_timestamp: i64,
    pub labels: BTreeMap<String, String>,
    pub status: ComponentStatus,
}

/// A PD (placement driver) member
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PDInfo {
    pub name: String,
    pub version: String,
    pub git_hash: String,
    pub ip: String,
    pub port: u16,
    pub deploy_path: String,
    pub start_timestamp: i64,
    pub status: ComponentStatus,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrafanaInfo {
    pub ip: String,
    pub port: u16,
    pub deploy_path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertManagerInfo {
    pub ip: String,
    pub port: u16,
    pub deploy_path: String,
}

/// Node list for one cluster role plus the error that prevented fetching it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodesSection<T> {
    pub nodes: Vec<T>,
    pub err: Option<String>,
}

impl<T> NodesSection<T> {
    pub fn from_nodes(nodes: Vec<T>) -> Self {
        Self { nodes, err: None }
    }

    pub fn from_error(err: impl ToString) -> Self {
        Self {
            nodes: Vec::new(),
            err: Some(err.to_string()),
        }
    }

    pub fn is_err(&self) -> bool {
        self.err.is_some()
    }
}

impl<T> Default for NodesSection<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            err: None,
        }
    }
}

/// Singleton auxiliary service plus the error that prevented resolving it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceField<T> {
    pub node: Option<T>,
    pub err: Option<String>,
}

impl<T> ServiceField<T> {
    pub fn from_node(node: Option<T>) -> Self {
        Self { node, err: None }
    }

    pub fn from_error(err: impl ToString) -> Self {
        Self {
            node: None,
            err: Some(err.to_string()),
        }
    }

    pub fn is_err(&self) -> bool {
        self.err.is_some()
    }
}

impl<T> Default for ServiceField<T> {
    fn default() -> Self {
        Self {
            node: None,
            err: None,
        }
    }
}

/// Composite topology answer for one request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub tidb: NodesSection<TiDBInfo>,
    pub tikv: NodesSection<TiKVInfo>,
    pub pd: NodesSection<PDInfo>,
    pub grafana: ServiceField<GrafanaInfo>,
    pub alert_manager: ServiceField<AlertManagerInfo>,
}

/// Split `host:port`, treating the last colon as the separator
pub fn split_host_port(address: &str) -> Option<(String, u16)> {
    let (host, port) = address.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let host = host.trim_start_matches('[').trim_end_matches(']');
    let port = port.parse::<u16>().ok()?;
    Some((host.to_string(), port))
}
