//! Topology collection across the coordination store and PD
//!
//! Three fetchers run in parallel under one deadline. Each one owns a fixed,
//! disjoint set of sections of [`ClusterInfo`] and hands them back as its own
//! result; the sections are merged after the join. A failing fetcher only
//! ever marks its own sections as failed.

use crate::client::Clients;
use crate::model::{ClusterInfo, NodesSection, ServiceField};
use crate::model::{AlertManagerInfo, GrafanaInfo, PDInfo, TiDBInfo, TiKVInfo};
use crate::registration::{parse_tidb_registrations, TIDB_TOPOLOGY_PREFIX};
use crate::task_group::TaskGroup;
use crate::{RequestContext, Result};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The independent sources of topology data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fetcher {
    /// TiDB registrations read straight from the coordination store
    CoordinationStore,
    /// TiKV stores as reported by PD
    TiKV,
    /// PD members plus the Grafana and AlertManager registrations
    PD,
}

impl Fetcher {
    pub const ALL: [Fetcher; 3] = [Fetcher::CoordinationStore, Fetcher::TiKV, Fetcher::PD];

    pub fn name(self) -> &'static str {
        match self {
            Fetcher::CoordinationStore => "tidb",
            Fetcher::TiKV => "tikv",
            Fetcher::PD => "pd",
        }
    }

    async fn fetch(self, ctx: RequestContext, clients: Arc<Clients>) -> SectionUpdate {
        match self {
            Fetcher::CoordinationStore => {
                let result = clients
                    .store
                    .get_prefix(&ctx, TIDB_TOPOLOGY_PREFIX)
                    .await
                    .map(|kvs| parse_tidb_registrations(&kvs));
                SectionUpdate::TiDB(nodes_section("tidb", result))
            }
            Fetcher::TiKV => {
                let result = clients.metadata.tikv_stores(&ctx).await;
                SectionUpdate::TiKV(nodes_section("tikv", result))
            }
            Fetcher::PD => {
                let metadata = &clients.metadata;
                let (pd, grafana, alert_manager) = tokio::join!(
                    metadata.pd_members(&ctx),
                    metadata.grafana(&ctx),
                    metadata.alert_manager(&ctx),
                );
                SectionUpdate::PD {
                    pd: nodes_section("pd", pd),
                    grafana: service_field("grafana", grafana),
                    alert_manager: service_field("alert_manager", alert_manager),
                }
            }
        }
    }

    /// Every section owned by this fetcher, marked as failed
    fn failed(self, err: impl Display) -> SectionUpdate {
        let message = err.to_string();
        match self {
            Fetcher::CoordinationStore => SectionUpdate::TiDB(NodesSection::from_error(message)),
            Fetcher::TiKV => SectionUpdate::TiKV(NodesSection::from_error(message)),
            Fetcher::PD => SectionUpdate::PD {
                pd: NodesSection::from_error(&message),
                grafana: ServiceField::from_error(&message),
                alert_manager: ServiceField::from_error(message),
            },
        }
    }
}

/// Sections produced by exactly one fetcher
#[derive(Debug)]
enum SectionUpdate {
    TiDB(NodesSection<TiDBInfo>),
    TiKV(NodesSection<TiKVInfo>),
    PD {
        pd: NodesSection<PDInfo>,
        grafana: ServiceField<GrafanaInfo>,
        alert_manager: ServiceField<AlertManagerInfo>,
    },
}

impl SectionUpdate {
    fn apply(self, info: &mut ClusterInfo) {
        match self {
            SectionUpdate::TiDB(section) => info.tidb = section,
            SectionUpdate::TiKV(section) => info.tikv = section,
            SectionUpdate::PD {
                pd,
                grafana,
                alert_manager,
            } => {
                info.pd = pd;
                info.grafana = grafana;
                info.alert_manager = alert_manager;
            }
        }
    }
}

fn nodes_section<T>(section: &str, result: Result<Vec<T>>) -> NodesSection<T> {
    match result {
        Ok(nodes) => {
            debug!("Fetched {} {} nodes", nodes.len(), section);
            NodesSection::from_nodes(nodes)
        }
        Err(e) => {
            warn!("Failed to fetch {} topology: {}", section, e);
            NodesSection::from_error(e)
        }
    }
}

fn service_field<T>(section: &str, result: Result<Option<T>>) -> ServiceField<T> {
    match result {
        Ok(node) => {
            debug!("Resolved {} (registered: {})", section, node.is_some());
            ServiceField::from_node(node)
        }
        Err(e) => {
            warn!("Failed to resolve {}: {}", section, e);
            ServiceField::from_error(e)
        }
    }
}

/// Collect the cluster topology from every source.
///
/// Never fails as a whole: a source that errors, panics or misses the
/// deadline leaves an error message in its own sections only.
pub async fn collect_topology(
    ctx: &RequestContext,
    clients: &Arc<Clients>,
    timeout: Duration,
) -> ClusterInfo {
    let mut group = TaskGroup::new(ctx, timeout);
    for fetcher in Fetcher::ALL {
        let clients = Arc::clone(clients);
        group.spawn(move |ctx| fetcher.fetch(ctx, clients));
    }

    let mut info = ClusterInfo::default();
    for (fetcher, outcome) in Fetcher::ALL.into_iter().zip(group.join().await) {
        let update = outcome.unwrap_or_else(|e| {
            warn!("Fetcher {} did not complete: {}", fetcher.name(), e);
            fetcher.failed(e)
        });
        update.apply(&mut info);
    }
    info
}
