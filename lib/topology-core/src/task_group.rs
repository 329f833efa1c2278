//! Deadline-bounded group of concurrently running tasks

use crate::RequestContext;
use futures::future::join_all;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::debug;

/// Why a task in the group produced no value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("task panicked: {0}")]
    Panicked(String),
}

pub type TaskOutcome<T> = std::result::Result<T, TaskError>;

/// Deadline applied to a whole topology operation unless configured otherwise
pub const OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

/// TaskGroup runs independent tasks in parallel under one shared deadline.
///
/// Each task is spawned onto the runtime as soon as it is added and gets a
/// copy of the group's context. `join` waits for every task; a task still
/// pending at the deadline is dropped and reported as
/// [`TaskError::DeadlineExceeded`]. Outcomes are returned in spawn order.
pub struct TaskGroup<T> {
    ctx: RequestContext,
    handles: Vec<JoinHandle<Option<T>>>,
}

impl<T: Send + 'static> TaskGroup<T> {
    /// Create a group whose deadline is `timeout` from now, capped by the
    /// parent's own deadline.
    pub fn new(parent: &RequestContext, timeout: Duration) -> Self {
        Self {
            ctx: parent.child_with_timeout(timeout),
            handles: Vec::new(),
        }
    }

    /// The context shared by every task in the group
    pub fn context(&self) -> RequestContext {
        self.ctx
    }

    /// Start a task immediately
    pub fn spawn<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let ctx = self.ctx;
        let fut = task(ctx);
        let handle = tokio::spawn(async move {
            match ctx.deadline() {
                Some(deadline) => tokio::time::timeout_at(deadline, fut).await.ok(),
                None => Some(fut.await),
            }
        });
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait until every task has finished or been abandoned
    pub async fn join(self) -> Vec<TaskOutcome<T>> {
        let outcomes: Vec<TaskOutcome<T>> = join_all(self.handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(Some(value)) => Ok(value),
                Ok(None) => Err(TaskError::DeadlineExceeded),
                Err(e) => Err(TaskError::Panicked(e.to_string())),
            })
            .collect();

        let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
        debug!(
            "Task group joined: {} completed, {} failed",
            outcomes.len() - failed,
            failed
        );

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_tasks_run_concurrently() {
        let started = Instant::now();
        let mut group = TaskGroup::new(&RequestContext::background(), Duration::from_secs(5));

        for i in 0..3u64 {
            group.spawn(move |_ctx| async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                i
            });
        }
        assert_eq!(group.len(), 3);

        let outcomes = group.join().await;
        assert_eq!(outcomes, vec![Ok(0), Ok(1), Ok(2)]);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_task_abandoned_at_deadline() {
        let started = Instant::now();
        let mut group = TaskGroup::new(&RequestContext::background(), Duration::from_secs(5));

        group.spawn(|_ctx| async { "fast" });
        group.spawn(|_ctx| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            "slow"
        });

        let outcomes = group.join().await;
        assert_eq!(outcomes[0], Ok("fast"));
        assert_eq!(outcomes[1], Err(TaskError::DeadlineExceeded));

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_secs(6));
    }

    #[tokio::test]
    async fn test_panic_is_isolated() {
        let mut group: TaskGroup<u32> =
            TaskGroup::new(&RequestContext::background(), Duration::from_secs(5));
        let explode = true;

        group.spawn(move |_ctx| async move {
            if explode {
                panic!("boom");
            }
            0
        });
        group.spawn(|_ctx| async { 7 });

        let outcomes = group.join().await;
        assert!(matches!(outcomes[0], Err(TaskError::Panicked(_))));
        assert_eq!(outcomes[1], Ok(7));
    }

    #[tokio::test]
    async fn test_tasks_share_group_context() {
        let parent = RequestContext::with_timeout(Duration::from_secs(60));
        let mut group = TaskGroup::new(&parent, Duration::from_secs(5));
        let expected = group.context().deadline();

        group.spawn(|ctx| async move { ctx.deadline() });
        group.spawn(|ctx| async move { ctx.deadline() });

        for outcome in group.join().await {
            assert_eq!(outcome, Ok(expected));
        }
    }

    #[tokio::test]
    async fn test_empty_group_joins_immediately() {
        let group: TaskGroup<()> = TaskGroup::new(&RequestContext::background(), Duration::from_secs(5));
        assert!(group.is_empty());
        assert!(group.join().await.is_empty());
    }
}
