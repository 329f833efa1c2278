//! PD client for cluster membership and liveness

use crate::etcd::EtcdClient;
use crate::http::send_json;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use topology_core::model::{
    split_host_port, AlertManagerInfo, ComponentStatus, GrafanaInfo, PDInfo, TiKVInfo,
};
use topology_core::registration::{
    decode_record, ALERT_MANAGER_TOPOLOGY_KEY, GRAFANA_TOPOLOGY_KEY,
};
use topology_core::{ClusterMetadata, KeyValue, RequestContext, Result};

const STORES_PATH: &str = "/pd/api/v1/stores";
const MEMBERS_PATH: &str = "/pd/api/v1/members";
const HEALTH_PATH: &str = "/pd/api/v1/health";

#[derive(Debug, Default, Deserialize)]
struct StoresResponse {
    #[serde(default)]
    stores: Vec<StoreEntry>,
}

#[derive(Debug, Deserialize)]
struct StoreEntry {
    store: StoreMeta,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoreMeta {
    address: String,
    version: String,
    git_hash: String,
    status_address: String,
    deploy_path: String,
    start_timestamp: i64,
    state_name: String,
    labels: Vec<StoreLabel>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StoreLabel {
    key: String,
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct MembersResponse {
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Member {
    name: String,
    member_id: u64,
    client_urls: Vec<String>,
    binary_version: String,
    git_hash: String,
    deploy_path: String,
    start_timestamp: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemberHealth {
    member_id: u64,
    health: bool,
}

/// Registration value stored under `/topology/grafana` and
/// `/topology/alertmanager`
#[derive(Debug, Deserialize)]
struct ServiceRegistration {
    ip: String,
    port: u16,
    #[serde(default)]
    deploy_path: String,
}

/// PdClient queries the PD HTTP API and PD's embedded etcd
#[derive(Clone)]
pub struct PdClient {
    http: reqwest::Client,
    endpoint: String,
    kv: EtcdClient,
}

impl PdClient {
    /// Create a client for a PD client URL, e.g. `http://127.0.0.1:2379`
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        let kv = EtcdClient::new(http.clone(), endpoint.clone());
        Self { http, endpoint, kv }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.endpoint, path);
        send_json(ctx, self.http.get(&url), &url).await
    }

    async fn service_registration(
        &self,
        ctx: &RequestContext,
        key: &str,
    ) -> Result<Option<ServiceRegistration>> {
        match self.kv.get(ctx, key).await? {
            Some(kv) => decode_service(&kv).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ClusterMetadata for PdClient {
    async fn tikv_stores(&self, ctx: &RequestContext) -> Result<Vec<TiKVInfo>> {
        let response: StoresResponse = self.get(ctx, STORES_PATH).await?;
        Ok(convert_stores(response))
    }

    async fn pd_members(&self, ctx: &RequestContext) -> Result<Vec<PDInfo>> {
        let (members, health) = tokio::try_join!(
            self.get::<MembersResponse>(ctx, MEMBERS_PATH),
            self.get::<Vec<MemberHealth>>(ctx, HEALTH_PATH),
        )?;
        Ok(convert_members(members, health))
    }

    async fn grafana(&self, ctx: &RequestContext) -> Result<Option<GrafanaInfo>> {
        let registration = self.service_registration(ctx, GRAFANA_TOPOLOGY_KEY).await?;
        Ok(registration.map(|r| GrafanaInfo {
            ip: r.ip,
            port: r.port,
            deploy_path: r.deploy_path,
        }))
    }

    async fn alert_manager(&self, ctx: &RequestContext) -> Result<Option<AlertManagerInfo>> {
        let registration = self
            .service_registration(ctx, ALERT_MANAGER_TOPOLOGY_KEY)
            .await?;
        Ok(registration.map(|r| AlertManagerInfo {
            ip: r.ip,
            port: r.port,
            deploy_path: r.deploy_path,
        }))
    }
}

fn decode_service(kv: &KeyValue) -> Result<ServiceRegistration> {
    decode_record(kv)
}

fn store_status(state_name: &str) -> ComponentStatus {
    match state_name {
        "Up" => ComponentStatus::Up,
        "Offline" => ComponentStatus::Offline,
        "Tombstone" => ComponentStatus::Tombstone,
        "Down" | "Disconnected" => ComponentStatus::Down,
        _ => ComponentStatus::Unknown,
    }
}

fn convert_stores(response: StoresResponse) -> Vec<TiKVInfo> {
    let mut nodes: Vec<TiKVInfo> = response
        .stores
        .into_iter()
        .map(|entry| {
            let store = entry.store;
            let (ip, port) = split_host_port(&store.address).unwrap_or_default();
            let status_port = split_host_port(&store.status_address)
                .map(|(_, port)| port)
                .unwrap_or_default();
            let labels: BTreeMap<String, String> = store
                .labels
                .into_iter()
                .map(|label| (label.key, label.value))
                .collect();

            TiKVInfo {
                version: store.version,
                git_hash: store.git_hash,
                ip,
                port,
                status_port,
                deploy_path: store.deploy_path,
                start_timestamp: store.start_timestamp,
                labels,
                status: store_status(&store.state_name),
            }
        })
        .collect();

    nodes.sort_by(|a, b| (&a.ip, a.port).cmp(&(&b.ip, b.port)));
    nodes
}

/// Host and port of a client URL such as `http://10.0.0.1:2379`
fn client_url_host_port(url: &str) -> Option<(String, u16)> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = without_scheme.split('/').next().unwrap_or(without_scheme);
    split_host_port(authority)
}

fn convert_members(response: MembersResponse, health: Vec<MemberHealth>) -> Vec<PDInfo> {
    let health: HashMap<u64, bool> = health
        .into_iter()
        .map(|h| (h.member_id, h.health))
        .collect();

    let mut nodes: Vec<PDInfo> = response
        .members
        .into_iter()
        .map(|member| {
            let (ip, port) = member
                .client_urls
                .first()
                .and_then(|url| client_url_host_port(url))
                .unwrap_or_default();
            let status = match health.get(&member.member_id) {
                Some(true) => ComponentStatus::Up,
                _ => ComponentStatus::Down,
            };

            PDInfo {
                name: member.name,
                version: member.binary_version,
                git_hash: member.git_hash,
                ip,
                port,
                deploy_path: member.deploy_path,
                start_timestamp: member.start_timestamp,
                status,
            }
        })
        .collect();

    nodes.sort_by(|a, b| a.name.cmp(&b.name));
    nodes
}
