//! Helpers for building aggregators against a mock posts service

use post_aggregator::{Aggregator, CommentAuthorResolution, Config, ReqwestTransport};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// Configuration pointing at `server`
pub fn config_for(server: &MockServer, comment_authors: CommentAuthorResolution) -> Config {
    Config {
        base_url: server.uri(),
        connect_timeout: Duration::from_secs(5),
        comment_authors,
        ..Default::default()
    }
}

/// Aggregator using the real reqwest transport against `server`
pub fn aggregator_for(server: &MockServer, comment_authors: CommentAuthorResolution) -> Aggregator {
    let config = config_for(server, comment_authors);
    let transport = Arc::new(ReqwestTransport::new(&config).expect("build transport"));
    Aggregator::from_config(&config, transport).expect("build aggregator")
}

/// Aggregator with sequential comment-author resolution
pub fn sequential_aggregator(server: &MockServer) -> Aggregator {
    aggregator_for(server, CommentAuthorResolution::Sequential)
}
