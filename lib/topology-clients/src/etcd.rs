//! Coordination store client speaking the etcd v3 JSON gateway
//!
//! Keys and values travel base64-encoded, as the gateway maps the gRPC
//! `bytes` fields onto JSON strings.

use crate::http::send_json;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use topology_core::{CoordinationStore, KeyValue, RequestContext, Result, TopologyError};
use tracing::{debug, warn};

const RANGE_PATH: &str = "/v3/kv/range";
const DELETE_RANGE_PATH: &str = "/v3/kv/deleterange";

#[derive(Serialize)]
struct RangeRequest {
    key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    range_end: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RangeResponse {
    #[serde(default)]
    kvs: Vec<RawKeyValue>,
}

#[derive(Debug, Deserialize)]
struct RawKeyValue {
    key: String,
    #[serde(default)]
    value: String,
}

#[derive(Serialize)]
struct DeleteRangeRequest {
    key: String,
}

#[derive(Debug, Default, Deserialize)]
struct DeleteRangeResponse {
    // int64 fields are rendered as strings by the gateway
    #[serde(default)]
    deleted: Option<String>,
}

/// EtcdClient reads and deletes keys through an etcd (or PD) client URL
#[derive(Clone)]
pub struct EtcdClient {
    http: reqwest::Client,
    endpoint: String,
}

impl EtcdClient {
    /// Create a client for `endpoint`, e.g. `http://127.0.0.1:2379`
    pub fn new(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self { http, endpoint }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Read `[key, range_end)`, or the single `key` without a range end
    pub async fn range(
        &self,
        ctx: &RequestContext,
        key: &[u8],
        range_end: Option<&[u8]>,
    ) -> Result<Vec<KeyValue>> {
        let url = format!("{}{}", self.endpoint, RANGE_PATH);
        let body = RangeRequest {
            key: STANDARD.encode(key),
            range_end: range_end.map(|end| STANDARD.encode(end)),
        };

        let response: RangeResponse =
            send_json(ctx, self.http.post(&url).json(&body), &url).await?;
        Ok(decode_range_response(&response))
    }

    /// Read a single key
    pub async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Option<KeyValue>> {
        let mut kvs = self.range(ctx, key.as_bytes(), None).await?;
        Ok(kvs.pop())
    }
}

#[async_trait]
impl CoordinationStore for EtcdClient {
    async fn get_prefix(&self, ctx: &RequestContext, prefix: &str) -> Result<Vec<KeyValue>> {
        let range_end = prefix_range_end(prefix.as_bytes());
        let kvs = self.range(ctx, prefix.as_bytes(), Some(range_end.as_slice())).await?;
        debug!("Read {} keys under {}", kvs.len(), prefix);
        Ok(kvs)
    }

    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<()> {
        let url = format!("{}{}", self.endpoint, DELETE_RANGE_PATH);
        let body = DeleteRangeRequest {
            key: STANDARD.encode(key),
        };

        let response: DeleteRangeResponse =
            send_json(ctx, self.http.post(&url).json(&body), &url).await?;
        debug!(
            "Deleted {} ({} keys removed)",
            key,
            response.deleted.as_deref().unwrap_or("0")
        );
        Ok(())
    }
}

/// Smallest key greater than every key starting with `prefix`
pub fn prefix_range_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return end;
        }
    }
    // Prefix made only of 0xff bytes: scan to the end of the keyspace
    vec![0]
}

/// Decode every pair of a range response, skipping the ones that are not
/// valid base64 or whose key is not UTF-8
fn decode_range_response(response: &RangeResponse) -> Vec<KeyValue> {
    response
        .kvs
        .iter()
        .filter_map(|raw| match decode_key_value(raw) {
            Ok(kv) => Some(kv),
            Err(e) => {
                warn!("Skipping undecodable key: {}", e);
                None
            }
        })
        .collect()
}

fn decode_key_value(raw: &RawKeyValue) -> Result<KeyValue> {
    let invalid = |reason: String| TopologyError::InvalidRecord {
        key: raw.key.clone(),
        reason,
    };

    let key = STANDARD.decode(&raw.key).map_err(|e| invalid(e.to_string()))?;
    let key = String::from_utf8(key).map_err(|e| invalid(e.to_string()))?;
    let value = STANDARD.decode(&raw.value).map_err(|e| invalid(e.to_string()))?;
    Ok(KeyValue::new(key, value))
}
