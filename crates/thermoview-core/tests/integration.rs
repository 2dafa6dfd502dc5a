//! Link manager integration tests against the mock peripheral.

use std::sync::Arc;
use std::time::Duration;

use thermoview_core::mock::format_grid_payload;
use thermoview_core::uuid::{AVERAGE_TEMPERATURE, MAX_TEMPERATURE, RAW_GRID};
use thermoview_core::{
    DisconnectReason, Error, FailurePoint, HandshakeStage, LinkConfig, LinkEvent, LinkManager,
    MockPeripheral, MockProvider, SessionState, SubscribePolicy, ThermalGrid, ThermalSnapshot,
};
use tokio::sync::watch;
use tokio::time::timeout;

fn setup(policy: SubscribePolicy) -> (Arc<MockPeripheral>, Arc<LinkManager<MockProvider>>) {
    let peripheral = Arc::new(MockPeripheral::default());
    let provider = MockProvider::new(Arc::clone(&peripheral));
    let link = LinkManager::new(provider, LinkConfig::new().policy(policy));
    (peripheral, Arc::new(link))
}

/// Wait until the snapshot satisfies `done`.
async fn wait_for(
    rx: &mut watch::Receiver<ThermalSnapshot>,
    done: impl Fn(&ThermalSnapshot) -> bool,
) -> ThermalSnapshot {
    timeout(Duration::from_secs(2), async {
        loop {
            {
                let snap = rx.borrow_and_update();
                if done(&snap) {
                    return snap.clone();
                }
            }
            rx.changed().await.expect("state dropped");
        }
    })
    .await
    .expect("state did not reach expected value")
}

fn ramp_grid() -> ThermalGrid {
    let values: Vec<f64> = (0..64).map(|i| 20.0 + f64::from(i) / 4.0).collect();
    ThermalGrid::from_values(&values).unwrap()
}

#[tokio::test]
async fn test_connect_and_receive_all_three_values() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    let mut rx = link.watch();

    assert_eq!(link.connect().await, SessionState::Connected);

    assert!(peripheral.push_grid(&ramp_grid()));
    assert!(peripheral.push_text(AVERAGE_TEMPERATURE, "23.5"));
    assert!(peripheral.push_text(MAX_TEMPERATURE, "41.0"));

    let snap = wait_for(&mut rx, |s| {
        s.grid_revision == 1 && s.average_revision == 1 && s.maximum_revision == 1
    })
    .await;
    assert_eq!(snap.grid, ramp_grid());
    assert_eq!(snap.average, 23.5);
    assert_eq!(snap.maximum, 41.0);
    assert_eq!(snap.session, SessionState::Connected);
}

#[tokio::test]
async fn test_short_grid_is_discarded() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    let mut events = link.events();
    let mut rx = link.watch();
    link.connect().await;

    peripheral.push_grid(&ThermalGrid::uniform(30.0));
    wait_for(&mut rx, |s| s.grid_revision == 1).await;

    let short = vec!["99"; 63].join(",");
    peripheral.push_text(RAW_GRID, &short);

    let discarded = timeout(Duration::from_secs(1), async {
        loop {
            if let LinkEvent::PayloadDiscarded { characteristic, .. } = events.recv().await.unwrap()
            {
                return characteristic;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(discarded, RAW_GRID.to_string());

    let snap = link.snapshot();
    assert_eq!(snap.grid, ThermalGrid::uniform(30.0));
    assert_eq!(snap.grid_revision, 1);
}

#[tokio::test]
async fn test_scalar_tolerates_trailing_text() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    let mut rx = link.watch();
    link.connect().await;

    peripheral.push_text(MAX_TEMPERATURE, "41.0C\0");
    let snap = wait_for(&mut rx, |s| s.maximum_revision == 1).await;
    assert_eq!(snap.maximum, 41.0);

    peripheral.push_text(MAX_TEMPERATURE, "--");
    let snap = wait_for(&mut rx, |s| s.maximum_revision == 2).await;
    assert!(snap.maximum.is_nan());
}

#[tokio::test]
async fn test_device_not_found_leaves_disconnected() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    peripheral.fail_at(FailurePoint::RequestDevice);
    let mut events = link.events();

    assert_eq!(link.connect().await, SessionState::Disconnected);
    assert_eq!(peripheral.connect_count(), 0);

    assert!(matches!(events.recv().await.unwrap(), LinkEvent::Connecting { .. }));
    assert!(matches!(
        events.recv().await.unwrap(),
        LinkEvent::ConnectFailed {
            stage: HandshakeStage::RequestDevice,
            ..
        }
    ));
}

#[tokio::test]
async fn test_wrong_device_name_is_not_found() {
    let peripheral = Arc::new(MockPeripheral::new("SomethingElse"));
    let link = LinkManager::new(MockProvider::new(peripheral), LinkConfig::default());
    assert!(matches!(
        link.try_connect().await,
        Err(Error::DeviceNotFound(_))
    ));
}

#[tokio::test]
async fn test_missing_service_disconnects_under_rollback() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    peripheral.fail_at(FailurePoint::ResolveService);

    assert!(matches!(
        link.try_connect().await,
        Err(Error::ServiceNotFound { .. })
    ));
    assert!(!peripheral.is_connected_sync());
    assert!(peripheral.subscribe_calls().is_empty());
}

#[tokio::test]
async fn test_subscribe_failure_rolls_back() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    peripheral.fail_at(FailurePoint::Subscribe(MAX_TEMPERATURE));
    let mut events = link.events();

    let err = link.try_connect().await.unwrap_err();
    assert!(matches!(err, Error::SubscriptionFailed { .. }));
    assert_eq!(link.session_state(), SessionState::Disconnected);

    // Grid and average were subscribed, then released.
    assert_eq!(
        peripheral.subscribe_calls(),
        vec![RAW_GRID, AVERAGE_TEMPERATURE, MAX_TEMPERATURE]
    );
    assert_eq!(
        peripheral.unsubscribe_calls(),
        vec![RAW_GRID, AVERAGE_TEMPERATURE]
    );
    assert!(!peripheral.is_connected_sync());
    assert!(link.active_subscriptions().await.is_empty());
    assert!(!peripheral.push_text(AVERAGE_TEMPERATURE, "20.0"));

    let mut saw_abandon = false;
    while let Ok(event) = events.try_recv() {
        if event
            == (LinkEvent::Disconnected {
                reason: DisconnectReason::HandshakeAbandoned,
            })
        {
            saw_abandon = true;
        }
    }
    assert!(saw_abandon);
}

#[tokio::test]
async fn test_subscribe_failure_keeps_partial() {
    let (peripheral, link) = setup(SubscribePolicy::KeepPartial);
    peripheral.fail_at(FailurePoint::Subscribe(MAX_TEMPERATURE));
    let mut rx = link.watch();

    assert_eq!(link.connect().await, SessionState::Disconnected);
    assert_eq!(
        link.active_subscriptions().await,
        vec![RAW_GRID, AVERAGE_TEMPERATURE]
    );

    // Earlier subscriptions keep delivering while the session reads disconnected.
    assert!(peripheral.push_text(AVERAGE_TEMPERATURE, "22.25"));
    let snap = wait_for(&mut rx, |s| s.average_revision == 1).await;
    assert_eq!(snap.average, 22.25);
    assert_eq!(snap.session, SessionState::Disconnected);

    // Disconnect releases the leftovers.
    link.disconnect().await.unwrap();
    assert!(link.active_subscriptions().await.is_empty());
    assert!(!peripheral.is_connected_sync());
}

#[tokio::test]
async fn test_retry_after_partial_failure_releases_leftovers() {
    let (peripheral, link) = setup(SubscribePolicy::KeepPartial);
    peripheral.fail_at(FailurePoint::Subscribe(MAX_TEMPERATURE));
    link.connect().await;

    peripheral.clear_failures();
    assert_eq!(link.connect().await, SessionState::Connected);
    assert_eq!(
        link.active_subscriptions().await,
        vec![RAW_GRID, AVERAGE_TEMPERATURE, MAX_TEMPERATURE]
    );
}

#[tokio::test]
async fn test_connect_while_connected_is_noop() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    link.connect().await;
    link.connect().await;
    assert_eq!(peripheral.connect_count(), 1);
    assert_eq!(peripheral.subscribe_calls().len(), 3);
}

#[tokio::test]
async fn test_concurrent_connects_share_one_session() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    peripheral.set_connect_latency(Duration::from_millis(50));

    let a = tokio::spawn({
        let link = Arc::clone(&link);
        async move { link.connect().await }
    });
    let b = tokio::spawn({
        let link = Arc::clone(&link);
        async move { link.connect().await }
    });

    assert_eq!(a.await.unwrap(), SessionState::Connected);
    assert_eq!(b.await.unwrap(), SessionState::Connected);
    assert_eq!(peripheral.connect_count(), 1);
}

#[tokio::test]
async fn test_no_updates_after_disconnect() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    let mut rx = link.watch();
    link.connect().await;

    peripheral.push_text(AVERAGE_TEMPERATURE, "20.0");
    wait_for(&mut rx, |s| s.average_revision == 1).await;

    link.disconnect().await.unwrap();
    assert_eq!(link.session_state(), SessionState::Disconnected);
    assert!(!peripheral.push_text(AVERAGE_TEMPERATURE, "99.0"));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let snap = link.snapshot();
    assert_eq!(snap.average, 20.0);
    assert_eq!(snap.average_revision, 1);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    link.disconnect().await.unwrap();
    link.connect().await;
    link.disconnect().await.unwrap();
    link.disconnect().await.unwrap();
    assert_eq!(peripheral.disconnect_count(), 1);
    assert_eq!(link.session_state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    let mut rx = link.watch();
    link.connect().await;
    link.disconnect().await.unwrap();
    assert_eq!(link.connect().await, SessionState::Connected);

    peripheral.push_text(RAW_GRID, &format_grid_payload(&ThermalGrid::uniform(27.0)));
    let snap = wait_for(&mut rx, |s| s.grid_revision == 1).await;
    assert_eq!(snap.grid, ThermalGrid::uniform(27.0));
    assert_eq!(peripheral.connect_count(), 2);
}

#[tokio::test]
async fn test_dropping_manager_stops_pumps() {
    let (peripheral, link) = setup(SubscribePolicy::Rollback);
    let state = link.state().clone();
    link.connect().await;
    drop(link);

    peripheral.push_text(AVERAGE_TEMPERATURE, "50.0");
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(state.snapshot().average_revision, 0);
}
