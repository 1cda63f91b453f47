//! Background runs through the sync service

use crate::{entry_page, listing, memory_store, mount_page, test_config};
use catalog_sync::cover::NoCoverLookup;
use catalog_sync::state::SyncStatus;
use catalog_sync::storage::CatalogStore;
use catalog_sync::sync::{SyncMode, SyncOrchestrator, SyncService};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn service(server: &MockServer, store: Arc<dyn CatalogStore>, retention: Duration) -> SyncService {
    let config = test_config(server, 1);
    let orchestrator =
        SyncOrchestrator::new(&config, Arc::clone(&store), Arc::new(NoCoverLookup)).unwrap();
    SyncService::new(orchestrator, store, "test-hash", retention)
}

async fn mount_small_catalog(server: &MockServer) {
    mount_page(server, "/", listing(&[("/hades/", "Hades")])).await;
    mount_page(
        server,
        "/hades/",
        entry_page("Hades", "<p>User: zagreus01 Pass: olympus77</p>"),
    )
    .await;
}

#[tokio::test]
async fn test_trigger_runs_and_records_audit_row() {
    let server = MockServer::start().await;
    mount_small_catalog(&server).await;

    let store = memory_store();
    let service = service(&server, store.clone(), Duration::from_secs(60));

    let ack = service.trigger(SyncMode::Full);
    assert!(ack.accepted);
    assert_eq!(ack.run_id, Some(1));

    let report = service.wait().await.unwrap().unwrap();
    assert_eq!(report.added, 1);

    let history = service.history(10).unwrap();
    assert_eq!(history.len(), 1);
    let row = &history[0].summary;
    assert_eq!(row.mode, SyncMode::Full);
    assert_eq!(row.status, SyncStatus::Concluded);
    assert_eq!(row.added, 1);
    assert_eq!(row.credentials_added, 1);
    assert_eq!(row.config_hash, "test-hash");
    assert!(row.finished_at.is_some());

    let snapshot = service.progress();
    assert_eq!(snapshot.run_id, Some(1));
    assert_eq!(snapshot.status, Some(SyncStatus::Concluded));
    assert_eq!(snapshot.recent_titles, vec!["Hades".to_string()]);
}

#[tokio::test]
async fn test_concurrent_trigger_is_refused() {
    let server = MockServer::start().await;

    mount_page(&server, "/", listing(&[("/hades/", "Hades")])).await;
    Mock::given(method("GET"))
        .and(path("/hades/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(entry_page("Hades", "<p>User: zagreus01 Pass: olympus77</p>"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let store = memory_store();
    let service = service(&server, store.clone(), Duration::from_secs(60));

    assert!(service.trigger(SyncMode::Full).accepted);
    let second = service.trigger(SyncMode::Fast);
    assert!(!second.accepted);
    assert_eq!(second.run_id, Some(1));

    service.wait().await.unwrap().unwrap();
    assert_eq!(store.counts().unwrap().sync_runs, 1);

    // a finished run no longer blocks
    let third = service.trigger(SyncMode::Full);
    assert!(third.accepted);
    assert_eq!(third.run_id, Some(2));
    let report = service.wait().await.unwrap().unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(store.counts().unwrap().sync_runs, 2);
}

#[tokio::test]
async fn test_progress_expires_after_retention() {
    let server = MockServer::start().await;
    mount_small_catalog(&server).await;

    let store = memory_store();
    let service = service(&server, store, Duration::from_millis(100));

    service.trigger(SyncMode::Full);
    service.wait().await.unwrap().unwrap();
    assert_eq!(service.progress().run_id, Some(1));

    tokio::time::sleep(Duration::from_millis(400)).await;
    let snapshot = service.progress();
    assert_eq!(snapshot.run_id, None);
    assert!(!snapshot.active);
}

#[tokio::test]
async fn test_cancel_stops_a_running_sync() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        listing(&[("/hades/", "Hades"), ("/celeste/", "Celeste"), ("/terraria/", "Terraria")]),
    )
    .await;
    for at in ["/hades/", "/celeste/", "/terraria/"] {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>nothing here</p>")
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
    }

    let store = memory_store();
    let service = service(&server, store.clone(), Duration::from_secs(60));

    assert!(!service.cancel());
    service.trigger(SyncMode::Full);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(service.cancel());

    let result = service.wait().await.unwrap();
    assert!(matches!(result, Err(catalog_sync::SyncError::Cancelled)));

    let history = service.history(1).unwrap();
    assert_eq!(history[0].summary.status, SyncStatus::Error);
    assert_eq!(history[0].summary.message, "sync cancelled");
}

#[tokio::test]
async fn test_processed_never_decreases_while_running() {
    let server = MockServer::start().await;

    let games = ["/hades/", "/celeste/", "/terraria/", "/stardew-valley/", "/hollow-knight/"];
    mount_page(
        &server,
        "/",
        listing(&games.iter().map(|at| (*at, "")).collect::<Vec<_>>()),
    )
    .await;
    for at in games {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<p>User: player01 Pass: hunter77</p>")
                    .set_delay(Duration::from_millis(150)),
            )
            .mount(&server)
            .await;
    }

    let store = memory_store();
    let service = service(&server, store, Duration::from_secs(60));
    assert!(service.trigger(SyncMode::Full).accepted);

    let mut snapshots = Vec::new();
    for _ in 0..250 {
        let snapshot = service.progress();
        let finished = snapshot.status.is_some_and(|s| s != SyncStatus::Processing);
        snapshots.push(snapshot);
        if finished {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    service.wait().await.unwrap().unwrap();

    assert!(snapshots.iter().any(|s| s.active && s.total > 0 && s.processed < s.total));
    for pair in snapshots.windows(2) {
        assert!(
            pair[1].processed >= pair[0].processed,
            "processed went from {} to {}",
            pair[0].processed,
            pair[1].processed
        );
    }

    let last = snapshots.last().unwrap();
    assert_eq!(last.status, Some(SyncStatus::Concluded));
    assert_eq!(last.total, 5);
    assert_eq!(last.processed, last.total);
}
