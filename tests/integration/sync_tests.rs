//! Whole sync runs against a mock origin

use crate::{entry_page, listing, memory_store, mount_page, seed_game, test_config};
use async_trait::async_trait;
use catalog_sync::cover::{CoverLookup, NoCoverLookup};
use catalog_sync::state::{SyncPhase, SyncStatus};
use catalog_sync::storage::{CatalogStore, SqliteStorage};
use catalog_sync::sync::{SyncMode, SyncOrchestrator};
use catalog_sync::title::title_key;
use catalog_sync::SyncError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct FixedCover;

#[async_trait]
impl CoverLookup for FixedCover {
    async fn lookup_cover(&self, title: &str) -> Option<String> {
        Some(format!("https://covers.example/{}.jpg", title_key(title)))
    }
}

fn orchestrator(server: &MockServer, store: &Arc<SqliteStorage>, attempts: u32) -> SyncOrchestrator {
    let config = test_config(server, attempts);
    let store: Arc<dyn CatalogStore> = store.clone();
    SyncOrchestrator::new(&config, store, Arc::new(NoCoverLookup)).unwrap()
}

/// Root lists three games and one category with a fourth
async fn mount_catalog(server: &MockServer) {
    mount_page(
        server,
        "/",
        listing(&[
            ("/hades/", "Hades - Free Steam Accounts"),
            ("/celeste/", "Celeste"),
            ("/terraria/", "Terraria"),
            ("/category/indie/", "Indie"),
        ]),
    )
    .await;
    mount_page(
        server,
        "/category/indie/",
        listing(&[("/stardew-valley/", "Stardew Valley"), ("/celeste/", "Celeste")]),
    )
    .await;

    mount_page(
        server,
        "/hades/",
        entry_page("Hades", "<p>User: zagreus01 Pass: olympus77</p>"),
    )
    .await;
    mount_page(
        server,
        "/celeste/",
        entry_page(
            "Celeste",
            "<div><p>Username: madeline9</p><p>Password: summit42</p>\
             <p>Username: badeline9</p><p>Password: mirror42</p></div>",
        ),
    )
    .await;
    mount_page(
        server,
        "/terraria/",
        entry_page("Terraria", "<p>User: pass Pass: password</p>"),
    )
    .await;
    mount_page(
        server,
        "/stardew-valley/",
        entry_page("Stardew Valley", "<p>User: farmer88 Pass: pass</p>"),
    )
    .await;
}

#[tokio::test]
async fn test_full_sync_adds_games_and_accounts() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let store = memory_store();
    let report = orchestrator(&server, &store, 1)
        .run_sync(SyncMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::Concluded);
    assert_eq!(report.entries_found, 4);
    assert_eq!(report.added, 4);
    assert_eq!(report.failed, 0);
    // zagreus01, madeline9, badeline9, farmer88 (incomplete)
    assert_eq!(report.credentials_added, 4);

    let counts = store.counts().unwrap();
    assert_eq!(counts.games, 4);
    assert_eq!(counts.accounts, 4);
    assert_eq!(counts.incomplete_accounts, 1);

    let hades = store
        .find_game_by_normalized_title(&title_key("Hades"))
        .unwrap()
        .unwrap();
    assert_eq!(hades.title, "Hades");
    assert_eq!(hades.description.as_deref(), Some("Accounts for Hades"));
    assert!(hades.source_url.unwrap().ends_with("/hades/"));
    assert!(store
        .list_account_usernames(hades.id)
        .unwrap()
        .contains("zagreus01"));

    // placeholder labels produce a game without accounts
    let terraria = store
        .find_game_by_normalized_title(&title_key("Terraria"))
        .unwrap()
        .unwrap();
    assert!(store.list_account_usernames(terraria.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_second_full_sync_is_idempotent() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let store = memory_store();
    let sync = orchestrator(&server, &store, 1);
    let cancel = CancellationToken::new();

    sync.run_sync(SyncMode::Full, &cancel).await.unwrap();
    let second = sync.run_sync(SyncMode::Full, &cancel).await.unwrap();

    assert_eq!(second.status, SyncStatus::Concluded);
    assert_eq!(second.entries_found, 4);
    assert_eq!(second.missing, 0);
    assert_eq!(second.added, 0);
    assert_eq!(second.credentials_added, 0);
    assert_eq!(store.counts().unwrap().games, 4);
    assert_eq!(store.counts().unwrap().accounts, 4);
}

#[tokio::test]
async fn test_existing_title_variant_is_not_duplicated() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let store = memory_store();
    seed_game(store.as_ref(), "HADES");

    let report = orchestrator(&server, &store, 1)
        .run_sync(SyncMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.added, 3);
    assert_eq!(store.counts().unwrap().games, 4);
}

#[tokio::test]
async fn test_noisy_stored_title_is_not_refetched() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let store = memory_store();
    seed_game(store.as_ref(), "Hades Steam G2A Keys");

    let sync = orchestrator(&server, &store, 1);
    let cancel = CancellationToken::new();
    let first = sync.run_sync(SyncMode::Full, &cancel).await.unwrap();
    let second = sync.run_sync(SyncMode::Full, &cancel).await.unwrap();

    assert_eq!(first.added, 3);
    assert_eq!(first.updated_existing, 0);
    assert_eq!(second.missing, 0);
    assert_eq!(second.updated_existing, 0);
    assert_eq!(store.counts().unwrap().games, 4);
}

#[tokio::test]
async fn test_fast_mode_stops_when_front_page_is_known() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing(&[
            ("/hades/", "Hades"),
            ("/celeste/", "Celeste"),
            ("/category/indie/", "Indie"),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/category/indie/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/hades/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = memory_store();
    seed_game(store.as_ref(), "Hades");
    seed_game(store.as_ref(), "Celeste");

    let sync = orchestrator(&server, &store, 1);
    let report = sync
        .run_sync(SyncMode::Fast, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::Concluded);
    assert_eq!(report.added, 0);
    assert_eq!(report.entries_found, 2);
    assert_eq!(sync.progress().snapshot().phase, SyncPhase::Concluded);
}

#[tokio::test]
async fn test_fast_mode_runs_full_discovery_on_new_titles() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let store = memory_store();
    seed_game(store.as_ref(), "Hades");

    let report = orchestrator(&server, &store, 1)
        .run_sync(SyncMode::Fast, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.entries_found, 4);
    assert_eq!(report.added, 3);
}

#[tokio::test]
async fn test_exhausted_entry_is_counted_and_run_concludes() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing(&[("/hades/", "Hades"), ("/broken-game/", "Broken Game")]),
    )
    .await;
    mount_page(
        &server,
        "/hades/",
        entry_page("Hades", "<p>User: zagreus01 Pass: olympus77</p>"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/broken-game/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let store = memory_store();
    let sync = orchestrator(&server, &store, 2);
    let report = sync
        .run_sync(SyncMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.status, SyncStatus::Concluded);
    assert_eq!(report.added, 1);
    assert_eq!(report.failed, 1);

    let snapshot = sync.progress().snapshot();
    assert_eq!(snapshot.processed, 2);
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.remaining, 0);
    assert_eq!(snapshot.percent, 100.0);
}

#[tokio::test]
async fn test_slow_entry_times_out_as_failure() {
    let server = MockServer::start().await;

    mount_page(&server, "/", listing(&[("/slow-game/", "Slow Game")])).await;
    Mock::given(method("GET"))
        .and(path("/slow-game/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let store = memory_store();
    let report = orchestrator(&server, &store, 1)
        .run_sync(SyncMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.added, 0);
    assert_eq!(store.counts().unwrap().games, 0);
}

#[tokio::test]
async fn test_progress_counts_match_totals() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let store = memory_store();
    let sync = orchestrator(&server, &store, 1);
    sync.run_sync(SyncMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    let snapshot = sync.progress().snapshot();
    assert!(!snapshot.active);
    assert_eq!(snapshot.processed, snapshot.total);
    assert_eq!(snapshot.total, 4);
    // batch size 2
    assert_eq!(snapshot.total_batches, 2);
    assert_eq!(snapshot.current_batch, 2);
    assert_eq!(snapshot.added + snapshot.updated_existing + snapshot.failed, 4);
}

#[tokio::test]
async fn test_cancelled_run_ends_in_error() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let store = memory_store();
    let sync = orchestrator(&server, &store, 1);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = sync.run_sync(SyncMode::Full, &cancel).await;
    assert!(matches!(result, Err(SyncError::Cancelled)));

    let snapshot = sync.progress().snapshot();
    assert_eq!(snapshot.status, Some(SyncStatus::Error));
    assert_eq!(snapshot.message, "sync cancelled");
    assert_eq!(store.counts().unwrap().games, 0);
}

#[tokio::test]
async fn test_cover_lookup_fills_new_games() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let store = memory_store();
    let config = test_config(&server, 1);
    let dyn_store: Arc<dyn CatalogStore> = store.clone();
    let sync = SyncOrchestrator::new(&config, dyn_store, Arc::new(FixedCover)).unwrap();
    sync.run_sync(SyncMode::Full, &CancellationToken::new())
        .await
        .unwrap();

    let celeste = store
        .find_game_by_normalized_title(&title_key("Celeste"))
        .unwrap()
        .unwrap();
    assert_eq!(
        celeste.cover_url.as_deref(),
        Some("https://covers.example/celeste.jpg")
    );
}
