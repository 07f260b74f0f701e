//! Fail-fast task group for fan-out/fan-in work
//!
//! Children run as independent tokio tasks and share one cancellation token.
//! [`TaskGroup::join_all`] returns the successes in spawn order, or the first
//! failure after cancelling every sibling and waiting for all of them to stop.

use crate::error::{Error, Result};
use std::future::Future;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// A set of child tasks with all-or-nothing results
///
/// Dropping the group without joining cancels the token and aborts children.
pub struct TaskGroup<T> {
    tasks: JoinSet<(usize, Result<T>)>,
    token: CancellationToken,
    spawned: usize,
}

impl<T: Send + 'static> TaskGroup<T> {
    /// Create a group with its own root token
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Create a group whose token is cancelled when `parent` is
    pub fn with_parent(parent: &CancellationToken) -> Self {
        Self::with_token(parent.child_token())
    }

    fn with_token(token: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            token,
            spawned: 0,
        }
    }

    /// Token observed by every child
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// True if nothing was spawned
    pub fn is_empty(&self) -> bool {
        self.spawned == 0
    }

    /// Spawn a child; `f` receives the group's token
    ///
    /// Returns the child's position in the eventual result vector.
    pub fn spawn<F, Fut>(&mut self, f: F) -> usize
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let index = self.spawned;
        self.spawned += 1;

        let child = f(self.token.clone());
        self.tasks.spawn(async move { (index, child.await) });
        index
    }

    /// Wait for every child
    ///
    /// On the first failure (an `Err` or a panicking child) the token is
    /// cancelled before anything else happens. The remaining children are
    /// then drained and their outcomes discarded, so no child outlives the
    /// call.
    pub async fn join_all(mut self) -> Result<Vec<T>> {
        let mut slots: Vec<Option<T>> = (0..self.spawned).map(|_| None).collect();

        while let Some(joined) = self.tasks.join_next().await {
            let (index, error) = match joined {
                Ok((index, Ok(value))) => {
                    slots[index] = Some(value);
                    continue;
                }
                Ok((index, Err(e))) => (Some(index), e),
                Err(join_error) => (None, Error::Task(join_error)),
            };

            self.token.cancel();
            tracing::debug!(
                child = ?index,
                remaining = self.tasks.len(),
                error = %error,
                "child failed, cancelling siblings"
            );
            self.drain().await;
            return Err(error);
        }

        let results: Vec<T> = slots.into_iter().flatten().collect();
        debug_assert_eq!(results.len(), self.spawned);
        Ok(results)
    }

    async fn drain(&mut self) {
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok((index, Err(e))) if !e.is_cancelled() => {
                    tracing::debug!(child = index, error = %e, "sibling failure discarded");
                }
                Err(join_error) if join_error.is_panic() => {
                    tracing::warn!(error = %join_error, "sibling panicked during cancellation");
                }
                _ => {}
            }
        }
    }
}

impl<T: Send + 'static> Default for TaskGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for TaskGroup<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
