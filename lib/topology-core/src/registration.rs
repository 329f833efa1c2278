//! Node registration records kept in the coordination store
//!
//! A TiDB instance registers itself under `/topology/tidb/<address>/` with
//! two keys: `info` carries its static metadata as JSON, and `ttl` is a
//! heartbeat key bound to a lease that disappears when the instance stops
//! refreshing it.

use crate::client::KeyValue;
use crate::model::{split_host_port, ComponentStatus, TiDBInfo};
use crate::{Result, TopologyError};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::warn;

pub const TIDB_TOPOLOGY_PREFIX: &str = "/topology/tidb/";
pub const GRAFANA_TOPOLOGY_KEY: &str = "/topology/grafana";
pub const ALERT_MANAGER_TOPOLOGY_KEY: &str = "/topology/alertmanager";

const TTL_SUFFIX: &str = "ttl";
const INFO_SUFFIX: &str = "info";

pub fn ttl_key(address: &str) -> String {
    format!("{}{}/{}", TIDB_TOPOLOGY_PREFIX, address, TTL_SUFFIX)
}

pub fn info_key(address: &str) -> String {
    format!("{}{}/{}", TIDB_TOPOLOGY_PREFIX, address, INFO_SUFFIX)
}

/// Both keys making up the registration of `address`
pub fn registration_keys(address: &str) -> [String; 2] {
    [ttl_key(address), info_key(address)]
}

/// Reject addresses that would escape the node's key namespace
pub fn validate_address(address: &str) -> Result<()> {
    if address.trim().is_empty() || address.contains('/') {
        return Err(TopologyError::InvalidAddress(address.to_string()));
    }
    Ok(())
}

/// Decode a JSON registration value
pub fn decode_record<T: DeserializeOwned>(kv: &KeyValue) -> Result<T> {
    serde_json::from_slice(&kv.value).map_err(|e| TopologyError::InvalidRecord {
        key: kv.key.clone(),
        reason: e.to_string(),
    })
}

/// Payload of a `/topology/tidb/<address>/info` key
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TiDBRegistration {
    version: String,
    git_hash: String,
    status_port: u16,
    deploy_path: String,
    start_timestamp: i64,
}

#[derive(Default)]
struct PendingNode<'a> {
    info: Option<&'a KeyValue>,
    alive: bool,
}

/// Build the TiDB node list from a prefix scan of `/topology/tidb/`.
///
/// Instances without an `info` key are not listed. Malformed records are
/// skipped. Nodes come back sorted by address.
pub fn parse_tidb_registrations(kvs: &[KeyValue]) -> Vec<TiDBInfo> {
    let mut pending: BTreeMap<&str, PendingNode<'_>> = BTreeMap::new();

    for kv in kvs {
        let Some(rest) = kv.key.strip_prefix(TIDB_TOPOLOGY_PREFIX) else {
            continue;
        };
        let Some((address, suffix)) = rest.rsplit_once('/') else {
            continue;
        };
        match suffix {
            INFO_SUFFIX => pending.entry(address).or_default().info = Some(kv),
            TTL_SUFFIX => pending.entry(address).or_default().alive = true,
            _ => {}
        }
    }

    let mut nodes = Vec::with_capacity(pending.len());
    for (address, node) in pending {
        let Some(info_kv) = node.info else {
            continue;
        };
        let Some((ip, port)) = split_host_port(address) else {
            warn!("Skipping TiDB registration with malformed address: {}", address);
            continue;
        };
        let info: TiDBRegistration = match decode_record(info_kv) {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping TiDB registration: {}", e);
                continue;
            }
        };

        nodes.push(TiDBInfo {
            version: info.version,
            git_hash: info.git_hash,
            ip,
            port,
            status_port: info.status_port,
            deploy_path: info.deploy_path,
            start_timestamp: info.start_timestamp,
            status: if node.alive {
                ComponentStatus::Up
            } else {
                ComponentStatus::Down
            },
        });
    }

    nodes
}
