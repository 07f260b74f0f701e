//! Core types: identifiers, fetched entities and the assembled aggregates

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Create a new identifier
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the inner i64 value
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl PartialEq<i64> for $name {
            fn eq(&self, other: &i64) -> bool {
                self.0 == *other
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Unique identifier for a post
    PostId
);
id_newtype!(
    /// Unique identifier for a comment
    CommentId
);
id_newtype!(
    /// Unique identifier for an author
    AuthorId
);

/// A post as returned by the posts-list endpoint
///
/// Only the identifiers are interpreted. Every other field the server sends
/// is kept verbatim in `extra` and written back out on serialization.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Post identifier
    pub id: PostId,
    /// Identifier of the post's author
    pub author_id: AuthorId,
    /// Opaque content fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A comment as returned by the per-post comments endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Comment identifier
    pub id: CommentId,
    /// Identifier of the post this comment belongs to
    pub post_id: PostId,
    /// Identifier of the comment's author
    pub author_id: AuthorId,
    /// Opaque content fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An author as returned by the author-by-id endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Author identifier
    pub id: AuthorId,
    /// Opaque profile fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A comment paired with its resolved author
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    /// The comment
    pub comment: Comment,
    /// The author fetched for `comment.author_id`
    pub author: Author,
}

impl CommentWithAuthor {
    /// Pair a comment with the author fetched for it
    pub fn new(comment: Comment, author: Author) -> Self {
        if comment.author_id != author.id {
            tracing::warn!(
                comment_id = comment.id.0,
                expected_author = comment.author_id.0,
                received_author = author.id.0,
                "author endpoint returned a different id than requested"
            );
        }
        Self { comment, author }
    }

    /// True when `comment.author_id == author.id`
    pub fn is_consistent(&self) -> bool {
        self.comment.author_id == self.author.id
    }
}

/// A fully resolved post: the post, its author and its comments with authors
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostWithAuthorAndComments {
    /// The post
    pub post: Post,
    /// The author fetched for `post.author_id`
    pub author: Author,
    /// Comments in the order the comments endpoint returned them
    pub comments: Vec<CommentWithAuthor>,
}

impl PostWithAuthorAndComments {
    /// Assemble an aggregate from its resolved parts
    pub fn new(post: Post, author: Author, comments: Vec<CommentWithAuthor>) -> Self {
        if post.author_id != author.id {
            tracing::warn!(
                post_id = post.id.0,
                expected_author = post.author_id.0,
                received_author = author.id.0,
                "author endpoint returned a different id than requested"
            );
        }
        Self {
            post,
            author,
            comments,
        }
    }

    /// True when the post's author and every comment's author match their ids
    pub fn is_consistent(&self) -> bool {
        self.post.author_id == self.author.id
            && self.comments.iter().all(CommentWithAuthor::is_consistent)
    }
}

/// Lifecycle of a single aggregation call
///
/// `Pending -> FetchingPosts -> FanningOut -> {AllResolved | Failed}`.
/// `AllResolved` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum AggregationState {
    /// No call has started yet
    Pending,
    /// Waiting for the posts list
    FetchingPosts,
    /// Per-post work is in flight
    FanningOut {
        /// Number of posts being resolved
        posts: usize,
    },
    /// Every post was resolved
    AllResolved {
        /// Number of aggregates produced
        posts: usize,
    },
    /// The call failed; no aggregates were produced
    Failed,
}

impl AggregationState {
    /// True for `AllResolved` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AggregationState::AllResolved { .. } | AggregationState::Failed
        )
    }
}
