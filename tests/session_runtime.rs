//! Map session driver on a paused Tokio clock

#![cfg(feature = "runtime-tokio")]

use spawnfence::location::mock::MockLocationProvider;
use spawnfence::session::{MapNotice, MapSession, MapSessionDeps};
use spawnfence::source::StaticCreatureSource;
use spawnfence::{
    meters_to_degrees, AckDisposition, AckMailbox, CaptureAck, ControllerEvent, Coordinate,
    CreatureDescriptor, GameConfig, GameError, LocationError, PositionSample, RegenerationReason,
    SessionMetricsHandle, TokioSpawner,
};
use std::sync::Arc;
use std::time::Duration;

fn anchor() -> Coordinate {
    Coordinate::new(10.0, 123.0)
}

fn north_of(origin: Coordinate, meters: f64) -> Coordinate {
    Coordinate::new(origin.latitude + meters_to_degrees(meters), origin.longitude)
}

fn sample(coordinate: Coordinate) -> PositionSample {
    PositionSample::new(coordinate, tokio::time::Instant::now().into_std())
}

fn config() -> GameConfig {
    GameConfig {
        max_batch_offset: 0,
        ..GameConfig::default()
    }
}

fn catalogue() -> StaticCreatureSource {
    StaticCreatureSource::new(vec![
        CreatureDescriptor::new("1", "bulbasaur"),
        CreatureDescriptor::new("4", "charmander"),
        CreatureDescriptor::new("7", "squirtle"),
    ])
}

fn launch(provider: Arc<MockLocationProvider>, metrics: SessionMetricsHandle) -> MapSession {
    let deps = MapSessionDeps::new(Arc::new(catalogue()), provider)
        .with_metrics(metrics)
        .with_seed(21);
    MapSession::launch(&TokioSpawner::new(), config(), deps).unwrap()
}

fn regenerations(notices: &[MapNotice], wanted: RegenerationReason) -> usize {
    notices
        .iter()
        .filter(|n| {
            matches!(
                n,
                MapNotice::Controller(ControllerEvent::SpawnsRegenerated { reason, .. }) if *reason == wanted
            )
        })
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_startup_spawns_and_reports_enter() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let mut session = launch(provider.clone(), SessionMetricsHandle::new());
    let handle = session.handle();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.spawns.len(), 3);
    assert_eq!(snapshot.anchor, Some(anchor()));
    assert!(snapshot.tracking);
    assert_eq!(provider.subscriber_count(), 1);
    assert_eq!(regenerations(&session.drain_notices(), RegenerationReason::Initial), 1);

    let target = snapshot.spawns[0].clone();
    provider.push(sample(north_of(target.position, 60.0)));
    provider.push(sample(target.position));

    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.membership.contains(&target.spawn_id));
    assert!(snapshot.open_opportunities.contains(&target.spawn_id));

    let opened = session
        .drain_notices()
        .into_iter()
        .filter(|n| matches!(n, MapNotice::Controller(ControllerEvent::OpportunityOpened(o)) if o.spawn.spawn_id == target.spawn_id))
        .count();
    assert_eq!(opened, 1);
}

#[tokio::test(start_paused = true)]
async fn test_capture_round_trip_through_the_handle() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let mut session = launch(provider.clone(), SessionMetricsHandle::new());
    let handle = session.handle();

    let target = handle.snapshot().await.unwrap().spawns[1].clone();
    assert!(matches!(
        handle.begin_capture(target.spawn_id).await,
        Err(GameError::NoOpportunity(_))
    ));

    provider.push(sample(target.position));
    let spawn = handle.begin_capture(target.spawn_id).await.unwrap();
    assert_eq!(spawn.spawn_id, target.spawn_id);

    // the capture screen owns the user; walking away changes nothing
    provider.push(sample(north_of(target.position, 100.0)));
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.active_capture, Some(target.spawn_id));
    assert!(snapshot.membership.contains(&target.spawn_id));

    let mailbox = AckMailbox::new();
    let ack = CaptureAck::new(target.spawn_id, target.creature_id.clone());
    mailbox.post(ack.clone());
    mailbox.post(ack);
    let dispositions = handle.apply_mailbox(&mailbox).await.unwrap();
    assert_eq!(
        dispositions,
        vec![AckDisposition::Applied, AckDisposition::Duplicate]
    );

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.spawns.len(), 2);
    assert_eq!(snapshot.active_capture, None);

    let captured = session
        .drain_notices()
        .into_iter()
        .filter(|n| matches!(n, MapNotice::SpawnCaptured { .. }))
        .count();
    assert_eq!(captured, 1);
}

#[tokio::test(start_paused = true)]
async fn test_stationary_user_gets_one_idle_respawn() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let metrics = SessionMetricsHandle::new();
    let mut session = launch(provider.clone(), metrics.clone());
    let handle = session.handle();
    let first = handle.snapshot().await.unwrap();

    tokio::time::sleep(Duration::from_secs(125)).await;
    provider.push(sample(north_of(anchor(), 4.0)));
    tokio::time::sleep(Duration::from_secs(176)).await;

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.generation, first.generation + 1);
    assert!(snapshot
        .spawns
        .iter()
        .all(|s| first.spawns.iter().all(|old| old.spawn_id != s.spawn_id)));

    tokio::time::sleep(Duration::from_secs(240)).await;
    assert_eq!(handle.snapshot().await.unwrap().generation, first.generation + 1);

    assert_eq!(regenerations(&session.drain_notices(), RegenerationReason::Idle), 1);
    assert_eq!(metrics.regenerations(RegenerationReason::Idle), 1);
}

#[tokio::test(start_paused = true)]
async fn test_walking_keeps_spawns_alive() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let session = launch(provider.clone(), SessionMetricsHandle::new());
    let handle = session.handle();
    let first = handle.snapshot().await.unwrap();

    for step in 1..=10 {
        tokio::time::sleep(Duration::from_secs(60)).await;
        provider.push(sample(north_of(anchor(), 20.0 * step as f64)));
    }

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.generation, first.generation);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_without_anchor_is_rejected() {
    let provider = Arc::new(MockLocationProvider::new());
    let mut session = launch(provider.clone(), SessionMetricsHandle::new());
    let handle = session.handle();

    handle.refresh().await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert!(snapshot.spawns.is_empty());

    let notices = session.drain_notices();
    assert_eq!(notices[0], MapNotice::NoAnchor);
    assert!(notices
        .iter()
        .any(|n| matches!(n, MapNotice::RefreshRejected(_))));

    // the first position update becomes the anchor
    provider.push(sample(anchor()));
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.spawns.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_replaces_spawns() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let session = launch(provider.clone(), SessionMetricsHandle::new());
    let handle = session.handle();
    let first = handle.snapshot().await.unwrap();

    provider.push(sample(first.spawns[0].position));
    handle.refresh().await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.generation, first.generation + 1);
    assert!(snapshot.open_opportunities.is_empty());
    assert!(snapshot
        .membership
        .iter()
        .all(|id| snapshot.spawns.iter().any(|s| s.spawn_id == *id)));
}

#[tokio::test(start_paused = true)]
async fn test_repeated_wave_is_served_from_creature_cache() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let source = Arc::new(catalogue());
    let metrics = SessionMetricsHandle::new();
    let deps = MapSessionDeps::new(source.clone(), provider)
        .with_metrics(metrics.clone())
        .with_seed(21);
    let session = MapSession::launch(&TokioSpawner::new(), config(), deps).unwrap();
    let handle = session.handle();
    let first = handle.snapshot().await.unwrap();

    handle.refresh().await.unwrap();
    let second = handle.snapshot().await.unwrap();

    assert_eq!(second.generation, first.generation + 1);
    assert_eq!(second.spawns.len(), 3);
    assert_eq!(source.fetch_count(), 1);
    assert_eq!(metrics.source_cache_hit_rate(), 50.0);
}

#[tokio::test(start_paused = true)]
async fn test_zero_creature_cache_lifetime_is_rejected() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let config = GameConfig {
        creature_cache_ttl_secs: 0,
        ..config()
    };
    let deps = MapSessionDeps::new(Arc::new(catalogue()), provider);
    assert!(matches!(
        MapSession::launch(&TokioSpawner::new(), config, deps),
        Err(GameError::Config(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_fetch_spawns_nothing() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let deps = MapSessionDeps::new(Arc::new(StaticCreatureSource::unavailable()), provider);
    let session = MapSession::launch(&TokioSpawner::new(), config(), deps).unwrap();

    let snapshot = session.handle().snapshot().await.unwrap();
    assert!(snapshot.spawns.is_empty());
    assert_eq!(snapshot.anchor, Some(anchor()));
}

#[tokio::test(start_paused = true)]
async fn test_location_errors_are_reported() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let mut session = launch(provider.clone(), SessionMetricsHandle::new());
    let handle = session.handle();
    handle.snapshot().await.unwrap();
    session.drain_notices();

    provider.push_error(LocationError::Timeout);
    handle.snapshot().await.unwrap();
    assert_eq!(
        session.drain_notices(),
        vec![MapNotice::LocationFailed(LocationError::Timeout)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_unsubscribes_and_goes_quiet() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let mut session = launch(provider.clone(), SessionMetricsHandle::new());
    let handle = session.handle();
    let first = handle.snapshot().await.unwrap();

    handle.shutdown().await.unwrap();
    assert_eq!(provider.unsubscribe_count(), 1);
    assert_eq!(provider.push(sample(first.spawns[0].position)), 0);

    session.drain_notices();
    assert_eq!(session.next_notice().await, None);
    assert!(matches!(handle.refresh().await, Err(GameError::SessionClosed)));
}

#[tokio::test(start_paused = true)]
async fn test_dropping_every_handle_stops_the_session() {
    let provider = Arc::new(MockLocationProvider::at(anchor()));
    let session = launch(provider.clone(), SessionMetricsHandle::new());
    session.handle().snapshot().await.unwrap();

    let (handle, mut notices) = session.into_parts();
    drop(handle);
    while notices.recv().await.is_some() {}

    assert_eq!(provider.unsubscribe_count(), 1);
}
