//! Topology service owning the injected clients

use crate::client::{Clients, ClusterMetadata, CoordinationStore};
use crate::collector;
use crate::deleter;
use crate::model::ClusterInfo;
use crate::task_group::OPERATION_TIMEOUT;
use crate::{RequestContext, Result};
use std::sync::Arc;
use std::time::Duration;

/// TopologyService answers topology queries and retracts stale registrations
pub struct TopologyService {
    clients: Arc<Clients>,
    timeout: Duration,
}

impl TopologyService {
    pub fn new(store: Arc<dyn CoordinationStore>, metadata: Arc<dyn ClusterMetadata>) -> Self {
        Self {
            clients: Arc::new(Clients::new(store, metadata)),
            timeout: OPERATION_TIMEOUT,
        }
    }

    /// Override the per-operation deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Gather the topology of every component; failures are per section
    pub async fn collect_topology(&self, ctx: &RequestContext) -> ClusterInfo {
        collector::collect_topology(ctx, &self.clients, self.timeout).await
    }

    /// Delete both registration keys of the TiDB instance at `address`
    pub async fn delete_registration(&self, ctx: &RequestContext, address: &str) -> Result<()> {
        deleter::delete_registration(ctx, &self.clients.store, address, self.timeout).await
    }
}
