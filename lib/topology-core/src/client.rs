//! Seams to the external sources of topology truth

use crate::model::{AlertManagerInfo, GrafanaInfo, PDInfo, TiKVInfo};
use crate::{RequestContext, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A raw entry read from the coordination store
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Key-value coordination store holding node registrations (etcd)
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    /// Read every key starting with `prefix`
    async fn get_prefix(&self, ctx: &RequestContext, prefix: &str) -> Result<Vec<KeyValue>>;

    /// Delete one exact key. Deleting an absent key succeeds.
    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<()>;
}

/// Cluster metadata service (PD) answering membership and liveness queries
#[async_trait]
pub trait ClusterMetadata: Send + Sync {
    async fn tikv_stores(&self, ctx: &RequestContext) -> Result<Vec<TiKVInfo>>;

    async fn pd_members(&self, ctx: &RequestContext) -> Result<Vec<PDInfo>>;

    /// `Ok(None)` when no Grafana is registered for the cluster
    async fn grafana(&self, ctx: &RequestContext) -> Result<Option<GrafanaInfo>>;

    /// `Ok(None)` when no AlertManager is registered for the cluster
    async fn alert_manager(&self, ctx: &RequestContext) -> Result<Option<AlertManagerInfo>>;
}

/// Long-lived clients shared by every request
#[derive(Clone)]
pub struct Clients {
    pub store: Arc<dyn CoordinationStore>,
    pub metadata: Arc<dyn ClusterMetadata>,
}

impl Clients {
    pub fn new(store: Arc<dyn CoordinationStore>, metadata: Arc<dyn ClusterMetadata>) -> Self {
        Self { store, metadata }
    }
}
