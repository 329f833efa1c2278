//! Cluster topology aggregation and retraction
//!
//! This library provides:
//! - A deadline-bounded task group for fan-out/fan-in over independent sources
//! - Topology collection from the coordination store and PD with per-section
//!   failure isolation
//! - Best-effort deletion of stale TiDB registrations

pub mod client;
pub mod collector;
pub mod context;
pub mod deleter;
pub mod error;
pub mod model;
pub mod registration;
pub mod service;
pub mod task_group;

#[cfg(test)]
mod testing;

pub use client::{Clients, ClusterMetadata, CoordinationStore, KeyValue};
pub use context::RequestContext;
pub use error::{Result, TopologyError};
pub use model::ClusterInfo;
pub use service::TopologyService;
pub use task_group::{TaskError, TaskGroup, TaskOutcome, OPERATION_TIMEOUT};
