//! Mock endpoint fixtures for the posts service

use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount a JSON GET endpoint
pub async fn mount_json(server: &MockServer, endpoint: &str, body: Value) {
    mount_json_delayed(server, endpoint, body, Duration::ZERO).await;
}

/// Mount a JSON GET endpoint that answers after `delay`
pub async fn mount_json_delayed(server: &MockServer, endpoint: &str, body: Value, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body).set_delay(delay))
        .mount(server)
        .await;
}

/// Mount a GET endpoint with an arbitrary status and raw body
pub async fn mount_status(
    server: &MockServer,
    endpoint: &str,
    status: u16,
    body: &str,
    delay: Duration,
) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(
            ResponseTemplate::new(status)
                .set_body_string(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Post JSON with opaque content fields
pub fn post(id: i64, author_id: i64) -> Value {
    json!({
        "id": id,
        "authorId": author_id,
        "content": format!("post {id}"),
        "published": 1_700_000_000 + id,
        "likedByMe": false,
        "likes": 0
    })
}

/// Comment JSON with opaque content fields
pub fn comment(id: i64, post_id: i64, author_id: i64) -> Value {
    json!({
        "id": id,
        "postId": post_id,
        "authorId": author_id,
        "content": format!("comment {id}"),
        "published": 1_700_000_000 + id,
        "likedByMe": false,
        "likes": 0
    })
}

/// Author JSON with opaque profile fields
pub fn author(id: i64) -> Value {
    json!({
        "id": id,
        "name": format!("Author {id}"),
        "avatar": format!("avatar-{id}.jpg")
    })
}

/// Paths requested from `server` so far
pub async fn requested_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|r| r.url.path().to_string())
        .collect()
}
