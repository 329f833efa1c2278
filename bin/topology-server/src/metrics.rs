//! Prometheus metrics for the topology endpoints

use anyhow::Result;
use prometheus::{Counter, CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use std::time::Duration;
use topology_core::ClusterInfo;

/// Prometheus metrics collector for topology requests
#[derive(Clone)]
pub struct MetricsCollector {
    /// Total HTTP requests received, by route
    pub http_requests_total: CounterVec,
    /// HTTP request duration in seconds, by route
    pub http_request_duration_seconds: HistogramVec,
    /// Requests answered with a 4xx/5xx status
    pub http_errors_total: Counter,
    /// Topology sections that came back with an error
    pub section_errors_total: CounterVec,
    /// Registration deletes by outcome
    pub registration_deletes_total: CounterVec,
    pub registry: Arc<Registry>,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let http_requests_total = CounterVec::new(
            Opts::new("topology_http_requests_total", "Total HTTP requests"),
            &["route"],
        )?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "topology_http_request_duration_seconds",
                "HTTP request latency in seconds",
            ),
            &["route"],
        )?;

        let http_errors_total = Counter::new(
            "topology_http_errors_total",
            "Total HTTP error responses",
        )?;

        let section_errors_total = CounterVec::new(
            Opts::new(
                "topology_section_errors_total",
                "Topology sections that failed to fetch",
            ),
            &["section"],
        )?;

        let registration_deletes_total = CounterVec::new(
            Opts::new(
                "topology_registration_deletes_total",
                "TiDB registration deletes by result",
            ),
            &["result"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(http_errors_total.clone()))?;
        registry.register(Box::new(section_errors_total.clone()))?;
        registry.register(Box::new(registration_deletes_total.clone()))?;

        Ok(Self {
            http_requests_total,
            http_request_duration_seconds,
            http_errors_total,
            section_errors_total,
            registration_deletes_total,
            registry,
        })
    }

    /// Count one served request
    pub fn observe_request(&self, route: &str, status: u16, elapsed: Duration) {
        self.http_requests_total.with_label_values(&[route]).inc();
        self.http_request_duration_seconds
            .with_label_values(&[route])
            .observe(elapsed.as_secs_f64());
        if status >= 400 {
            self.http_errors_total.inc();
        }
    }

    /// Count every failed section of a topology answer
    pub fn observe_topology(&self, info: &ClusterInfo) {
        let failed = [
            ("tidb", info.tidb.is_err()),
            ("tikv", info.tikv.is_err()),
            ("pd", info.pd.is_err()),
            ("grafana", info.grafana.is_err()),
            ("alert_manager", info.alert_manager.is_err()),
        ];
        for (section, is_err) in failed {
            if is_err {
                self.section_errors_total.with_label_values(&[section]).inc();
            }
        }
    }

    pub fn observe_delete(&self, success: bool) {
        let result = if success { "ok" } else { "error" };
        self.registration_deletes_total
            .with_label_values(&[result])
            .inc();
    }

    /// Gather all metrics in Prometheus text format
    pub fn gather(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
