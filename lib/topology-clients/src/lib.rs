//! Network clients for the topology sources
//!
//! - `EtcdClient`: coordination store access over the etcd v3 JSON gateway
//! - `PdClient`: PD HTTP API for TiKV stores, PD members and auxiliary
//!   service registrations
mod http;
pub mod etcd;
pub mod pd;

pub use etcd::EtcdClient;
pub use pd::PdClient;
