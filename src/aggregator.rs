//! Aggregation scheduler: fan out per post, fan in to ordered aggregates
//!
//! One call runs `Pending -> FetchingPosts -> FanningOut -> {AllResolved | Failed}`:
//! 1. the post list is fetched with a single request;
//! 2. every post gets its own task, which resolves the post's author and its
//!    comments-with-authors concurrently;
//! 3. results are collected in post order. The first failure cancels every
//!    other in-flight post and fails the whole call; there is no partial result.

use crate::client::FetchClient;
use crate::config::{CommentAuthorResolution, Config};
use crate::error::{Error, Result};
use crate::task_group::TaskGroup;
use crate::transport::HttpTransport;
use crate::types::{AggregationState, Post, PostWithAuthorAndComments};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Builds [`PostWithAuthorAndComments`] aggregates for every post
pub struct Aggregator {
    client: FetchClient,
    comment_authors: CommentAuthorResolution,
    state_tx: watch::Sender<AggregationState>,
}

impl Aggregator {
    /// Create an aggregator over `client` with sequential comment-author resolution
    pub fn new(client: FetchClient) -> Self {
        let (state_tx, _) = watch::channel(AggregationState::Pending);
        Self {
            client,
            comment_authors: CommentAuthorResolution::default(),
            state_tx,
        }
    }

    /// Create an aggregator from validated configuration and a transport
    pub fn from_config(config: &Config, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        let client = FetchClient::new(transport, &config.base_url)?;
        Ok(Self::new(client).with_comment_authors(config.comment_authors))
    }

    /// Choose how the authors of one post's comments are resolved
    pub fn with_comment_authors(mut self, resolution: CommentAuthorResolution) -> Self {
        self.comment_authors = resolution;
        self
    }

    /// Watch the state of the most recent [`aggregate`](Self::aggregate) call
    pub fn subscribe(&self) -> watch::Receiver<AggregationState> {
        self.state_tx.subscribe()
    }

    /// Current state of the most recent call
    pub fn state(&self) -> AggregationState {
        *self.state_tx.borrow()
    }

    /// Fetch every post and resolve its author and comments
    ///
    /// Aggregates come back in the order of the posts list. If any request
    /// fails, every other in-flight request is cancelled, and the first
    /// error is returned once all of them have stopped. Cancelling `cancel`
    /// stops the whole call with [`Error::Cancelled`](crate::Error::Cancelled).
    pub async fn aggregate(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<PostWithAuthorAndComments>> {
        let start = Instant::now();
        self.state_tx.send_replace(AggregationState::FetchingPosts);

        let result = self.fan_out(cancel).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(aggregates) => {
                self.state_tx.send_replace(AggregationState::AllResolved {
                    posts: aggregates.len(),
                });
                let comments: usize = aggregates.iter().map(|a| a.comments.len()).sum();
                tracing::info!(
                    posts = aggregates.len(),
                    comments,
                    elapsed_ms,
                    "aggregation complete"
                );
            }
            Err(e) => {
                self.state_tx.send_replace(AggregationState::Failed);
                tracing::warn!(
                    error = %e,
                    code = e.error_code(),
                    elapsed_ms,
                    "aggregation failed"
                );
            }
        }

        result
    }

    /// [`aggregate`](Self::aggregate) bounded by `deadline`
    ///
    /// When the deadline passes, all in-flight work is cancelled and
    /// [`Error::DeadlineExceeded`](crate::Error::DeadlineExceeded) is returned.
    pub async fn aggregate_within(
        &self,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<Vec<PostWithAuthorAndComments>> {
        match tokio::time::timeout(deadline, self.aggregate(cancel)).await {
            Ok(result) => result,
            Err(_) => {
                self.state_tx.send_replace(AggregationState::Failed);
                tracing::warn!(deadline = ?deadline, "aggregation deadline exceeded");
                Err(Error::DeadlineExceeded(deadline))
            }
        }
    }

    async fn fan_out(&self, cancel: &CancellationToken) -> Result<Vec<PostWithAuthorAndComments>> {
        let posts = self.client.fetch_posts(cancel).await?;
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            posts = posts.len(),
            comment_authors = ?self.comment_authors,
            "fetched posts, resolving authors and comments"
        );
        self.state_tx.send_replace(AggregationState::FanningOut { posts: posts.len() });

        let mut group = TaskGroup::with_parent(cancel);
        for post in posts {
            let client = self.client.clone();
            let resolution = self.comment_authors;
            group.spawn(move |token| resolve_post(client, post, resolution, token));
        }
        group.join_all().await
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("client", &self.client)
            .field("comment_authors", &self.comment_authors)
            .field("state", &self.state())
            .finish()
    }
}

async fn resolve_post(
    client: FetchClient,
    post: Post,
    resolution: CommentAuthorResolution,
    token: CancellationToken,
) -> Result<PostWithAuthorAndComments> {
    let (author, comments) = futures::try_join!(
        client.fetch_author(post.author_id, &token),
        client.fetch_comments_with_authors(post.id, resolution, &token),
    )?;

    tracing::debug!(
        post_id = post.id.0,
        author_id = author.id.0,
        comments = comments.len(),
        "post resolved"
    );
    Ok(PostWithAuthorAndComments::new(post, author, comments))
}
