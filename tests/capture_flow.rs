//! Capture sessions wired to the controller, ledger and mailbox

use spawnfence::capture::mock::{MockArScene, MockPhotoSink};
use spawnfence::capture::start_capture;
use spawnfence::{
    AckDisposition, AckMailbox, CaptureDeps, CaptureFailure, CaptureOutcome, CaptureSession,
    Coordinate, CreatureDescriptor, GameConfig, InMemoryLedger, MockSpawner, PositionSample,
    ProgressionLedger, ProgressionRecord, RewardStatus, SessionMetricsHandle, SpawnGenerator,
    SpawnLifecycleController, StaticIdentity, TaskSpawner, UserId,
};
use std::sync::Arc;
use std::time::Instant;

struct Rig {
    controller: SpawnLifecycleController,
    scene: Arc<MockArScene>,
    sink: Arc<MockPhotoSink>,
    ledger: Arc<InMemoryLedger>,
    mailbox: AckMailbox,
    metrics: SessionMetricsHandle,
    user: UserId,
    spawner: MockSpawner,
}

impl Rig {
    fn new() -> Self {
        let now = Instant::now();
        let metrics = SessionMetricsHandle::new();
        let config = GameConfig::default();
        let mut controller =
            SpawnLifecycleController::with_generator(&config, SpawnGenerator::with_seed(50.0, 5))
                .with_metrics(metrics.clone());
        controller.on_creatures_ready(
            vec![
                CreatureDescriptor::new("25", "pikachu"),
                CreatureDescriptor::new("7", "squirtle"),
            ],
            now,
        );
        controller.on_anchor_ready(Coordinate::new(10.0, 123.0), now);

        let user = UserId::new("ash");
        let ledger = Arc::new(InMemoryLedger::default());
        ledger.register(&user);

        Self {
            controller,
            scene: Arc::new(MockArScene::new()),
            sink: Arc::new(MockPhotoSink::new()),
            ledger,
            mailbox: AckMailbox::new(),
            metrics,
            user,
            spawner: MockSpawner::blocking(),
        }
    }

    fn deps(&self) -> CaptureDeps {
        CaptureDeps::new(
            self.scene.clone(),
            self.sink.clone(),
            self.ledger.clone(),
            Arc::new(StaticIdentity::signed_in(self.user.clone())),
        )
        .with_metrics(self.metrics.clone())
        .with_mailbox(self.mailbox.clone())
    }

    fn walk_onto_first_spawn(&mut self) -> spawnfence::SpawnInstance {
        let spawn = self.controller.spawns()[0].clone();
        self.controller
            .on_position(PositionSample::new(spawn.position, Instant::now()));
        self.controller.begin_capture(spawn.spawn_id).unwrap()
    }

    fn record(&self) -> ProgressionRecord {
        self.spawner
            .block_on(self.ledger.get_record(&self.user))
            .unwrap()
            .unwrap()
    }
}

#[test]
fn test_successful_capture_rewards_once_and_retires_spawn() {
    let mut rig = Rig::new();
    let spawn = rig.walk_onto_first_spawn();

    let outcome = rig
        .spawner
        .block_on(start_capture(spawn.clone(), rig.deps()))
        .unwrap();
    assert!(matches!(
        outcome,
        CaptureOutcome::Success {
            reward: RewardStatus::Applied(ProgressionRecord { xp: 50, .. }),
            ..
        }
    ));
    assert_eq!(rig.sink.saved().len(), 1);

    // the map screen is shown twice, reading the mailbox each time
    let first = rig.controller.drain_mailbox(&rig.mailbox);
    let second = rig.controller.drain_mailbox(&rig.mailbox);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].1, AckDisposition::Applied);
    assert!(second.is_empty());

    // navigation replays the same token
    let replay = outcome.acknowledgement().unwrap();
    assert_eq!(rig.controller.apply_ack(&replay), AckDisposition::Duplicate);

    assert_eq!(rig.controller.spawns().len(), 1);
    assert_eq!(rig.record().capture_count, 1);
    assert_eq!(rig.metrics.rewards_applied(), 1);
    assert_eq!(rig.metrics.captures_confirmed(), 1);
}

#[test]
fn test_denied_storage_aborts_without_side_effects() {
    let mut rig = Rig::new();
    rig.sink = Arc::new(MockPhotoSink::failing(CaptureFailure::PermissionDenied));
    let spawn = rig.walk_onto_first_spawn();

    let outcome = rig
        .spawner
        .block_on(start_capture(spawn.clone(), rig.deps()))
        .unwrap();
    assert_eq!(
        outcome,
        CaptureOutcome::Failure {
            reason: CaptureFailure::PermissionDenied
        }
    );
    assert!(rig.mailbox.is_empty());
    assert_eq!(rig.record(), ProgressionRecord::default());
    assert_eq!(rig.controller.spawns().len(), 2);

    // user backs out of the capture screen; tracking resumes
    assert!(rig.controller.on_capture_aborted(&spawn.spawn_id));
    assert_eq!(rig.controller.active_capture(), None);
}

#[test]
fn test_failed_save_can_be_retried_in_the_same_session() {
    let rig = Rig::new();
    let spawn = rig.controller.spawns()[0].clone();
    rig.sink
        .set_failure(Some(CaptureFailure::SaveFailed("disk full".into())));

    let session = rig
        .spawner
        .block_on(CaptureSession::open(spawn, rig.deps()))
        .unwrap();
    let first = rig.spawner.block_on(session.shutter()).unwrap();
    assert!(!first.is_success());

    rig.sink.set_failure(None);
    let second = rig.spawner.block_on(session.shutter()).unwrap();
    assert!(second.is_success());

    let third = rig.spawner.block_on(session.shutter()).unwrap();
    assert_eq!(
        third,
        CaptureOutcome::Failure {
            reason: CaptureFailure::AlreadyCompleted
        }
    );
    assert_eq!(rig.ledger.write_count(), 1);
}

#[test]
fn test_ledger_failure_keeps_the_photo() {
    let mut rig = Rig::new();
    rig.ledger.set_fail_writes(true);
    let spawn = rig.walk_onto_first_spawn();

    let outcome = rig
        .spawner
        .block_on(start_capture(spawn, rig.deps()))
        .unwrap();
    match &outcome {
        CaptureOutcome::Success { reward, .. } => {
            assert!(matches!(reward, RewardStatus::Failed(_)))
        }
        other => panic!("expected success, got {other:?}"),
    }

    assert_eq!(rig.sink.saved().len(), 1);
    assert_eq!(rig.metrics.rewards_failed(), 1);
    let applied = rig.controller.drain_mailbox(&rig.mailbox);
    assert_eq!(applied[0].1, AckDisposition::Applied);
}

#[test]
fn test_signed_out_user_gets_no_reward() {
    let mut rig = Rig::new();
    let spawn = rig.walk_onto_first_spawn();
    let deps = CaptureDeps::new(
        rig.scene.clone(),
        rig.sink.clone(),
        rig.ledger.clone(),
        Arc::new(StaticIdentity::signed_out()),
    );

    let outcome = rig.spawner.block_on(start_capture(spawn, deps)).unwrap();
    assert!(matches!(
        outcome,
        CaptureOutcome::Success {
            reward: RewardStatus::NoIdentity,
            ..
        }
    ));
    assert_eq!(rig.ledger.write_count(), 0);
}

#[test]
fn test_capture_racing_a_refresh_is_a_stale_no_op() {
    let mut rig = Rig::new();
    let spawn = rig.walk_onto_first_spawn();

    let outcome = rig
        .spawner
        .block_on(start_capture(spawn.clone(), rig.deps()))
        .unwrap();
    assert!(outcome.is_success());

    // the map regenerated before it saw the acknowledgement
    let creatures = rig.controller.creatures().to_vec();
    rig.controller
        .on_refresh_requested(creatures, Instant::now())
        .unwrap();

    let applied = rig.controller.drain_mailbox(&rig.mailbox);
    assert_eq!(applied[0].1, AckDisposition::Stale);
    assert_eq!(rig.controller.spawns().len(), 2);
    assert_eq!(rig.metrics.stale_acks(), 1);
    // the reward was granted with the photo and is not taken back
    assert_eq!(rig.record().capture_count, 1);
}
