//! Resource fetchers for the posts service endpoints.

use crate::client::FetchClient;
use crate::config::CommentAuthorResolution;
use crate::error::Result;
use crate::task_group::TaskGroup;
use crate::types::{Author, AuthorId, Comment, CommentWithAuthor, Post, PostId};
use tokio_util::sync::CancellationToken;

/// Path of the posts-list endpoint
pub const POSTS_PATH: &str = "/api/slow/posts";

/// Path of the comments endpoint for `post_id`
pub fn comments_path(post_id: PostId) -> String {
    format!("{POSTS_PATH}/{post_id}/comments")
}

/// Path of the author endpoint for `author_id`
pub fn author_path(author_id: AuthorId) -> String {
    format!("/api/authors/{author_id}")
}

impl FetchClient {
    /// Fetch every post
    pub async fn fetch_posts(&self, cancel: &CancellationToken) -> Result<Vec<Post>> {
        self.get_json(POSTS_PATH, cancel).await
    }

    /// Fetch the comments of one post, in server order
    pub async fn fetch_comments(
        &self,
        post_id: PostId,
        cancel: &CancellationToken,
    ) -> Result<Vec<Comment>> {
        self.get_json(&comments_path(post_id), cancel).await
    }

    /// Fetch one author
    pub async fn fetch_author(
        &self,
        author_id: AuthorId,
        cancel: &CancellationToken,
    ) -> Result<Author> {
        self.get_json(&author_path(author_id), cancel).await
    }

    /// Fetch the comments of one post and pair each with its author
    ///
    /// With [`CommentAuthorResolution::Sequential`] authors are requested one
    /// at a time in comment order. With [`CommentAuthorResolution::Concurrent`]
    /// they are requested through a child [`TaskGroup`]. Either way the
    /// result keeps comment order and has one entry per comment.
    pub async fn fetch_comments_with_authors(
        &self,
        post_id: PostId,
        resolution: CommentAuthorResolution,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommentWithAuthor>> {
        let comments = self.fetch_comments(post_id, cancel).await?;
        tracing::debug!(
            post_id = post_id.0,
            comments = comments.len(),
            ?resolution,
            "resolving comment authors"
        );

        match resolution {
            CommentAuthorResolution::Sequential => {
                let mut resolved = Vec::with_capacity(comments.len());
                for comment in comments {
                    let author = self.fetch_author(comment.author_id, cancel).await?;
                    resolved.push(CommentWithAuthor::new(comment, author));
                }
                Ok(resolved)
            }
            CommentAuthorResolution::Concurrent => {
                let mut group = TaskGroup::with_parent(cancel);
                for comment in comments {
                    let client = self.clone();
                    group.spawn(move |token| async move {
                        let author = client.fetch_author(comment.author_id, &token).await?;
                        Ok::<_, crate::error::Error>(CommentWithAuthor::new(comment, author))
                    });
                }
                group.join_all().await
            }
        }
    }
}
