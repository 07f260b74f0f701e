//! # post-aggregator
//!
//! Concurrent fetch-and-aggregate client for a posts service.
//!
//! Fetches the post list, then for every post (concurrently) its author and
//! its comments with their authors, and assembles one
//! [`PostWithAuthorAndComments`] per post.
//!
//! ## Design
//!
//! - **Callback transports** - [`HttpTransport`] is push-style; [`transport::call`]
//!   bridges it into an awaitable with exactly-once resumption
//! - **Fail-fast fan-out** - [`TaskGroup`] cancels every sibling on the first
//!   failure and returns results in spawn order
//! - **Injected dependencies** - no global client; the transport is passed in,
//!   so tests substitute fakes or mock servers
//!
//! ## Quick Start
//!
//! ```no_run
//! use post_aggregator::{Aggregator, Config, ReqwestTransport};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         base_url: "http://192.168.0.102:9999".to_string(),
//!         ..Default::default()
//!     };
//!
//!     let transport = Arc::new(ReqwestTransport::new(&config)?);
//!     let aggregator = Aggregator::from_config(&config, transport)?;
//!
//!     let posts = aggregator.aggregate(&CancellationToken::new()).await?;
//!     println!("{} posts", posts.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Aggregation scheduler
pub mod aggregator;
/// Typed fetch client
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Resource fetchers for the service endpoints
pub mod resources;
/// Fail-fast task group
pub mod task_group;
/// HTTP transport seam and callback bridge
pub mod transport;
/// Core types and entities
pub mod types;

#[allow(clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use aggregator::Aggregator;
pub use client::FetchClient;
pub use config::{CommentAuthorResolution, Config};
pub use error::{Error, Result, TransportError};
pub use task_group::TaskGroup;
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{
    AggregationState, Author, AuthorId, Comment, CommentId, CommentWithAuthor, Post, PostId,
    PostWithAuthorAndComments,
};

/// Wait for a termination signal and cancel `token`
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub async fn cancel_on_signal(token: tokio_util::sync::CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => token.cancel(),
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Received Ctrl+C signal");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
