//! Integration tests for catalog-sync
//!
//! These tests use wiremock to stand up a mock catalog origin and drive
//! discovery and whole sync runs against it.

mod discovery_tests;
mod service_tests;
mod sync_tests;

use catalog_sync::config::{parse_config, Config};
use catalog_sync::storage::{CatalogStore, NewGame, SqliteStorage};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Config pointed at the mock server, with every delay disabled
pub fn test_config(server: &MockServer, max_attempts: u32) -> Config {
    parse_config(&format!(
        r#"
[origin]
root-url = "{}/"
page-delay-ms = 0
blind-increment = false

[fetcher]
timeout-secs = 1
max-attempts = {}
timeout-retry-delay-ms = 0
error-retry-delay-ms = 0

[sync]
batch-size = 2
concurrency = 2
entry-delay-ms = 0
batch-delay-ms = 0
progress-retention-secs = 1

[output]
database-path = ":memory:"
"#,
        server.uri(),
        max_attempts
    ))
    .expect("test config is valid")
}

pub fn memory_store() -> Arc<SqliteStorage> {
    Arc::new(SqliteStorage::new_in_memory().expect("in-memory store opens"))
}

pub fn seed_game(store: &dyn CatalogStore, title: &str) -> i64 {
    store
        .insert_game(&NewGame {
            title: title.to_string(),
            ..Default::default()
        })
        .expect("seed game inserts")
        .id()
}

pub fn listing(links: &[(&str, &str)]) -> String {
    let anchors: String = links
        .iter()
        .map(|(href, text)| format!(r#"<li><a href="{}">{}</a></li>"#, href, text))
        .collect();
    format!("<html><body><ul>{}</ul></body></html>", anchors)
}

pub fn entry_page(title: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>{0} - Free Steam Accounts</title>
<meta name="description" content="Accounts for {0}"></head>
<body><h1>{0}</h1>{1}</body></html>"#,
        title, body
    )
}

pub async fn mount_page(server: &MockServer, at: &str, html: String) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .mount(server)
        .await;
}
