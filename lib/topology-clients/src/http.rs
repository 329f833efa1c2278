//! Deadline-aware JSON exchange shared by the clients

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use topology_core::{RequestContext, Result, TopologyError};
use tracing::debug;

/// Send `request` and decode a JSON body, aborting at the context deadline
pub(crate) async fn send_json<T: DeserializeOwned>(
    ctx: &RequestContext,
    request: RequestBuilder,
    url: &str,
) -> Result<T> {
    ctx.check()?;
    if let Some(remaining) = ctx.remaining() {
        debug!("Requesting {} ({:?} left)", url, remaining);
    }

    ctx.run(async {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(TopologyError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.json::<T>().await.map_err(transport_error)
    })
    .await
}

/// Flatten an error and its sources into one message
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_message = cause.to_string();
        if !message.ends_with(&cause_message) {
            message.push_str(": ");
            message.push_str(&cause_message);
        }
        source = cause.source();
    }
    message
}

fn transport_error(err: reqwest::Error) -> TopologyError {
    TopologyError::Transport(error_chain(&err))
}
