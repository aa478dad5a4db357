//! Poll coordinator behavior against the mock portal

use std::sync::Arc;
use std::time::Duration;

use dvs_client::testing::{
    default_base_payload, test_config, TestServer, MOCK_IDENTIFIER, MOCK_PASSWORD,
};
use dvs_client::DvsPortal;
use dvs_core::EntityView;
use dvs_watch::{PollState, PortalWatcher, WatchConfig};
use serde_json::json;
use tokio::sync::watch;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn next_state(rx: &mut watch::Receiver<PollState>) -> PollState {
    timeout(WAIT, rx.changed()).await.unwrap().unwrap();
    rx.borrow_and_update().clone()
}

async fn wait_for<F>(rx: &mut watch::Receiver<PollState>, mut predicate: F) -> PollState
where
    F: FnMut(&PollState) -> bool,
{
    loop {
        let state = next_state(rx).await;
        if predicate(&state) {
            return state;
        }
    }
}

fn spawn_watcher(server: &TestServer, poll_interval: Duration) -> PortalWatcher {
    let client = DvsPortal::with_base_url(
        &server.base_url(),
        MOCK_IDENTIFIER,
        MOCK_PASSWORD,
        test_config(),
    )
    .unwrap();
    PortalWatcher::spawn(Arc::new(client), WatchConfig { poll_interval })
}

#[tokio::test]
async fn first_refresh_publishes_snapshot_views_and_plates() {
    let server = TestServer::start().await.unwrap();
    let watcher = spawn_watcher(&server, Duration::from_millis(100));
    let mut rx = watcher.subscribe();

    let state = wait_for(&mut rx, |s| s.available).await;
    assert_eq!(state.refreshes, 1);
    assert!(state.last_error.is_none());

    let snapshot = state.snapshot.unwrap();
    assert_eq!(snapshot.balance.balance, Some(380.0));

    // Every plate is new on the first refresh
    assert_eq!(
        state.new_plates,
        vec![
            "AB-123-C".to_string(),
            "KL-456-M".to_string(),
            "XY-999-Z".to_string()
        ]
    );

    // Views: balance, summary, one per plate
    assert!(state
        .views
        .iter()
        .any(|v| matches!(v, EntityView::Balance(_))));
    assert!(state
        .views
        .iter()
        .any(|v| matches!(v, EntityView::Reservations(_))));
    let plate_views = state
        .views
        .iter()
        .filter(|v| matches!(v, EntityView::Plate(_)))
        .count();
    assert_eq!(plate_views, 3);
}

#[tokio::test]
async fn failures_mark_unavailable_but_keep_the_stale_snapshot() {
    let server = TestServer::start().await.unwrap();
    let watcher = spawn_watcher(&server, Duration::from_millis(100));
    let mut rx = watcher.subscribe();

    wait_for(&mut rx, |s| s.available).await;

    server.portal.set_base_payload(json!({"Permits": []}));
    let state = wait_for(&mut rx, |s| !s.available).await;
    assert!(state.last_error.unwrap().contains("No permit"));
    // Stale data is kept, flagged unavailable
    let snapshot = state.snapshot.unwrap();
    assert_eq!(snapshot.balance.balance, Some(380.0));

    // Recovery on a later tick
    server.portal.set_base_payload(default_base_payload());
    let state = wait_for(&mut rx, |s| s.available).await;
    // Nothing newly discovered the second time around
    assert!(state.new_plates.is_empty());
}

#[tokio::test]
async fn request_refresh_polls_out_of_band() {
    let server = TestServer::start().await.unwrap();
    // Long cadence so only explicit refreshes advance the counter
    let watcher = spawn_watcher(&server, Duration::from_secs(300));
    let mut rx = watcher.subscribe();

    let state = wait_for(&mut rx, |s| s.available).await;
    assert_eq!(state.refreshes, 1);

    watcher.request_refresh();
    let state = next_state(&mut rx).await;
    assert_eq!(state.refreshes, 2);
}

#[tokio::test]
async fn newly_appearing_plate_is_reported_once() {
    let server = TestServer::start().await.unwrap();
    let watcher = spawn_watcher(&server, Duration::from_millis(100));
    let mut rx = watcher.subscribe();

    wait_for(&mut rx, |s| s.available).await;

    let mut payload = default_base_payload();
    payload["Permits"][0]["PermitMedias"][0]["LicensePlates"]
        .as_array_mut()
        .unwrap()
        .push(json!({"Value": "NEW-01-N", "Name": "Nieuw"}));
    server.portal.set_base_payload(payload);

    let state = wait_for(&mut rx, |s| !s.new_plates.is_empty()).await;
    assert_eq!(state.new_plates, vec!["NEW-01-N".to_string()]);

    // And never again on subsequent refreshes
    let state = next_state(&mut rx).await;
    assert!(state.new_plates.is_empty());
}
