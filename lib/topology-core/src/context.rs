//! Request-scoped execution context carrying an optional deadline

use crate::{Result, TopologyError};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Bounded-lifetime context handed to every outbound call.
///
/// The context is `Copy`, so each task owns its own handle to the same
/// deadline.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestContext {
    deadline: Option<Instant>,
}

impl RequestContext {
    /// A context that never expires
    pub fn background() -> Self {
        Self { deadline: None }
    }

    /// A context that expires `timeout` from now
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Derive a context expiring at the earlier of this context's deadline
    /// and `timeout` from now.
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < candidate => parent,
            _ => candidate,
        };
        Self::with_deadline(deadline)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` for a background context
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// Fail fast if the deadline has already passed
    pub fn check(&self) -> Result<()> {
        if self.is_expired() {
            Err(TopologyError::DeadlineExceeded)
        } else {
            Ok(())
        }
    }

    /// Race `fut` against the deadline.
    ///
    /// The future is dropped, and its I/O aborted, once the deadline passes.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, fut)
                .await
                .map_err(|_| TopologyError::DeadlineExceeded)?,
            None => fut.await,
        }
    }
}
