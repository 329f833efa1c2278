//! In-memory doubles for the client traits

use crate::client::{ClusterMetadata, CoordinationStore, KeyValue};
use crate::model::{AlertManagerInfo, ComponentStatus, GrafanaInfo, PDInfo, TiKVInfo};
use crate::registration::{info_key, ttl_key};
use crate::{RequestContext, Result, TopologyError};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Records how a double was called
#[derive(Default)]
pub struct CallStats {
    calls: AtomicUsize,
    expired: AtomicUsize,
}

impl CallStats {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that arrived with an already expired context
    pub fn expired(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }

    /// Count a call and simulate a network round trip of `latency`
    async fn round_trip<T>(
        &self,
        ctx: &RequestContext,
        latency: Duration,
        outcome: std::result::Result<T, String>,
    ) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if ctx.is_expired() {
            self.expired.fetch_add(1, Ordering::SeqCst);
            return Err(TopologyError::DeadlineExceeded);
        }
        ctx.run(async move {
            tokio::time::sleep(latency).await;
            outcome.map_err(TopologyError::Transport)
        })
        .await
    }
}

#[derive(Default)]
pub struct MockStore {
    pub kvs: Mutex<Vec<KeyValue>>,
    pub scan_error: Option<String>,
    pub failing_deletes: HashSet<String>,
    pub latency: Duration,
    pub scans: CallStats,
    pub deletes: CallStats,
    pub deleted_keys: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn with_kvs(kvs: Vec<KeyValue>) -> Self {
        Self {
            kvs: Mutex::new(kvs),
            ..Default::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.kvs.lock().unwrap().iter().any(|kv| kv.key == key)
    }
}

#[async_trait]
impl CoordinationStore for MockStore {
    async fn get_prefix(&self, ctx: &RequestContext, prefix: &str) -> Result<Vec<KeyValue>> {
        let outcome = match &self.scan_error {
            Some(err) => Err(err.clone()),
            None => Ok(self
                .kvs
                .lock()
                .unwrap()
                .iter()
                .filter(|kv| kv.key.starts_with(prefix))
                .cloned()
                .collect()),
        };
        self.scans.round_trip(ctx, self.latency, outcome).await
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<()> {
        let outcome = if self.failing_deletes.contains(key) {
            Err("etcdserver: request timed out".to_string())
        } else {
            Ok(())
        };
        self.deletes.round_trip(ctx, self.latency, outcome).await?;

        self.kvs.lock().unwrap().retain(|kv| kv.key != key);
        self.deleted_keys.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

pub struct MockMetadata {
    pub tikv: std::result::Result<Vec<TiKVInfo>, String>,
    pub pd: std::result::Result<Vec<PDInfo>, String>,
    pub grafana: std::result::Result<Option<GrafanaInfo>, String>,
    pub alert_manager: std::result::Result<Option<AlertManagerInfo>, String>,
    pub tikv_latency: Duration,
    pub pd_latency: Duration,
    pub stats: CallStats,
}

impl Default for MockMetadata {
    fn default() -> Self {
        Self {
            tikv: Ok(Vec::new()),
            pd: Ok(Vec::new()),
            grafana: Ok(None),
            alert_manager: Ok(None),
            tikv_latency: Duration::ZERO,
            pd_latency: Duration::ZERO,
            stats: CallStats::default(),
        }
    }
}

impl MockMetadata {
    /// A cluster with one TiKV, one PD and both auxiliary services
    pub fn healthy() -> Self {
        Self {
            tikv: Ok(vec![tikv_node("10.0.1.1", "v4.0.0")]),
            pd: Ok(vec![pd_node("pd-0", "10.0.2.1", "v4.0.0")]),
            grafana: Ok(Some(grafana_node())),
            alert_manager: Ok(Some(alert_manager_node())),
            ..Default::default()
        }
    }

    /// Every PD-backed query fails
    pub fn fail_pd(&mut self, err: &str) {
        self.pd = Err(err.to_string());
        self.grafana = Err(err.to_string());
        self.alert_manager = Err(err.to_string());
    }
}

#[async_trait]
impl ClusterMetadata for MockMetadata {
    async fn tikv_stores(&self, ctx: &RequestContext) -> Result<Vec<TiKVInfo>> {
        self.stats
            .round_trip(ctx, self.tikv_latency, self.tikv.clone())
            .await
    }

    async fn pd_members(&self, ctx: &RequestContext) -> Result<Vec<PDInfo>> {
        self.stats.round_trip(ctx, self.pd_latency, self.pd.clone()).await
    }

    async fn grafana(&self, ctx: &RequestContext) -> Result<Option<GrafanaInfo>> {
        self.stats
            .round_trip(ctx, self.pd_latency, self.grafana.clone())
            .await
    }

    async fn alert_manager(&self, ctx: &RequestContext) -> Result<Option<AlertManagerInfo>> {
        self.stats
            .round_trip(ctx, self.pd_latency, self.alert_manager.clone())
            .await
    }
}

/// `info` and `ttl` keys of a live TiDB registration
pub fn tidb_registration(address: &str, version: &str) -> Vec<KeyValue> {
    vec![
        KeyValue::new(
            info_key(address),
            format!(
                r#"{{"version":"{}","git_hash":"0000","status_port":10080,"deploy_path":"/deploy","start_timestamp":0}}"#,
                version
            ),
        ),
        KeyValue::new(ttl_key(address), "1"),
    ]
}

pub fn tikv_node(ip: &str, version: &str) -> TiKVInfo {
    TiKVInfo {
        version: version.to_string(),
        ip: ip.to_string(),
        port: 20160,
        status_port: 20180,
        status: ComponentStatus::Up,
        ..Default::default()
    }
}

pub fn pd_node(name: &str, ip: &str, version: &str) -> PDInfo {
    PDInfo {
        name: name.to_string(),
        version: version.to_string(),
        ip: ip.to_string(),
        port: 2379,
        status: ComponentStatus::Up,
        ..Default::default()
    }
}

pub fn grafana_node() -> GrafanaInfo {
    GrafanaInfo {
        ip: "10.0.3.1".to_string(),
        port: 3000,
        deploy_path: "/deploy/grafana".to_string(),
    }
}

pub fn alert_manager_node() -> AlertManagerInfo {
    AlertManagerInfo {
        ip: "10.0.3.2".to_string(),
        port: 9093,
        deploy_path: "/deploy/alertmanager".to_string(),
    }
}
