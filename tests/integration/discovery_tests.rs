//! Discovery against a mock origin: pagination, categories, fetching

use crate::{listing, mount_page, test_config};
use catalog_sync::crawler::{Crawler, FetchError, Fetcher};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn crawler(server: &MockServer, max_attempts: u32) -> Crawler {
    let config = test_config(server, max_attempts);
    let fetcher = Arc::new(Fetcher::new(config.fetcher.clone()).unwrap());
    Crawler::new(&config, fetcher).unwrap()
}

#[tokio::test]
async fn test_discovers_root_pages_and_categories() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing(&[
            ("/hades/", "Hades - Free Steam Accounts"),
            ("/celeste/", "Celeste"),
            ("/category/rpg/", "RPG"),
            ("/page/2/", "2"),
            ("/contact/", "Contact"),
        ]),
    )
    .await;
    mount_page(&server, "/page/2/", listing(&[("/hollow-knight/", "")])).await;
    mount_page(
        &server,
        "/category/rpg/",
        listing(&[("/terraria/", "Terraria"), ("/hades/", "Hades")]),
    )
    .await;

    let entries = crawler(&server, 1).discover_all().await.unwrap();
    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();

    assert_eq!(titles, vec!["Hades", "Celeste", "Hollow Knight", "Terraria"]);
    assert!(entries[0].source_url.ends_with("/hades/"));
}

#[tokio::test]
async fn test_next_link_continues_pagination() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        r#"<a href="/hades/">Hades</a><a class="next" href="/page/2/">Next</a>"#.to_string(),
    )
    .await;
    mount_page(&server, "/page/2/", listing(&[("/celeste/", "Celeste")])).await;

    let entries = crawler(&server, 1).discover_all().await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn test_missing_pages_end_pagination() {
    let server = MockServer::start().await;

    // page 3 is advertised but page 2 and 3 both 404
    mount_page(
        &server,
        "/",
        listing(&[("/hades/", "Hades"), ("/page/3/", "3")]),
    )
    .await;

    let entries = crawler(&server, 1).discover_all().await.unwrap();
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_front_page_only() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing(&[("/hades/", "Hades"), ("/category/rpg/", "RPG")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/category/rpg/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let entries = crawler(&server, 1).discover_front_page().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Hades");
}

#[tokio::test]
async fn test_unreachable_root_fails_discovery() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = crawler(&server, 1).discover_all().await;
    assert!(matches!(
        result,
        Err(catalog_sync::SyncError::Discovery(_))
    ));
}

#[tokio::test]
async fn test_fetcher_retries_until_exhausted() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let config = test_config(&server, 3);
    let fetcher = Fetcher::new(config.fetcher).unwrap();
    let err = fetcher
        .fetch(&format!("{}/flaky/", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Exhausted { attempts: 3, .. }));
}

#[tokio::test]
async fn test_fetcher_recovers_after_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/recovering/"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/recovering/", "<p>ok</p>".to_string()).await;

    let config = test_config(&server, 2);
    let fetcher = Fetcher::new(config.fetcher).unwrap();
    let page = fetcher
        .fetch(&format!("{}/recovering/", server.uri()))
        .await
        .unwrap();

    assert_eq!(page.status_code, 200);
    assert!(page.body.contains("ok"));
}
