use anyhow::Result;
use hyper::{server::conn::http1, service::service_fn};
use hyper_util::rt::tokio::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use topology_clients::{EtcdClient, PdClient};
use topology_core::TopologyService;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod handler;
mod metrics;
mod router;

use config::Config;
use handler::{handle_request, AppState};
use metrics::MetricsCollector;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting topology-server...");

    let config = Config::from_env()?;
    info!("  - etcd endpoint: {}", config.etcd_endpoint);
    info!("  - PD endpoint: {}", config.pd_endpoint);
    info!("  - Timeout: {:?}", config.timeout);

    // One pooled HTTP client shared by both sources
    let http = reqwest::Client::builder()
        .connect_timeout(config.timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .build()?;
    let store = Arc::new(EtcdClient::new(http.clone(), config.etcd_endpoint.clone()));
    let metadata = Arc::new(PdClient::new(http, config.pd_endpoint.clone()));

    let service = TopologyService::new(store, metadata).with_timeout(config.timeout);
    let metrics = MetricsCollector::new()?;
    let state = Arc::new(AppState { service, metrics });
    info!("Topology service initialized");

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!("HTTP server listening on {}", config.listen_addr);

    loop {
        let (stream, peer_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("Error accepting connection: {}", e);
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received, exiting...");
                return Ok(());
            }
        };
        let io = TokioIo::new(stream);
        let state = state.clone();

        tokio::task::spawn(async move {
            let service = service_fn(move |req| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(handle_request(req, &state).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Error serving connection from {}: {}", peer_addr, e);
            }
        });
    }
}
