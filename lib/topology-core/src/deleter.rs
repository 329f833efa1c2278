//! Removal of stale TiDB registrations from the coordination store

use crate::client::CoordinationStore;
use crate::registration::{registration_keys, validate_address};
use crate::task_group::{TaskError, TaskGroup};
use crate::{RequestContext, Result, TopologyError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Delete the `ttl` and `info` keys registered for `address`.
///
/// Both deletions run concurrently and independently; there is no rollback
/// when only one of them succeeds. The first error observed, in completion
/// order, is returned. A key that is already absent counts as deleted.
pub async fn delete_registration(
    ctx: &RequestContext,
    store: &Arc<dyn CoordinationStore>,
    address: &str,
    timeout: Duration,
) -> Result<()> {
    validate_address(address)?;

    let keys = registration_keys(address);
    let (err_tx, mut err_rx) = mpsc::channel::<TopologyError>(keys.len());

    let mut group = TaskGroup::new(ctx, timeout);
    for key in keys {
        let store = Arc::clone(store);
        let err_tx = err_tx.clone();
        group.spawn(move |ctx| async move {
            if let Err(e) = store.delete(&ctx, &key).await {
                warn!("Failed to delete {}: {}", key, e);
                // One slot per producer, so this never overflows
                let _ = err_tx.try_send(e);
            }
        });
    }
    drop(err_tx);

    let outcomes = group.join().await;

    if let Ok(err) = err_rx.try_recv() {
        return Err(err);
    }
    for outcome in outcomes {
        match outcome {
            Ok(()) => {}
            Err(TaskError::DeadlineExceeded) => return Err(TopologyError::DeadlineExceeded),
            Err(TaskError::Panicked(msg)) => return Err(TopologyError::Internal(msg)),
        }
    }

    info!("Deleted TiDB registration for {}", address);
    Ok(())
}
