//! Walk up to a spawn and catch it, all against in-memory collaborators

use spawnfence::capture::mock::{MockArScene, MockPhotoSink};
use spawnfence::capture::start_capture;
use spawnfence::location::mock::MockLocationProvider;
use spawnfence::session::{MapNotice, MapSession, MapSessionDeps};
use spawnfence::source::StaticCreatureSource;
use spawnfence::{
    AckMailbox, CaptureDeps, Coordinate, CreatureDescriptor, GameConfig, InMemoryLedger,
    PositionSample, ProgressionLedger, StaticIdentity, TokioSpawner, UserId,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("spawnfence v{}", spawnfence::VERSION);

    let home = Coordinate::new(10.0, 123.0);
    let provider = Arc::new(MockLocationProvider::at(home));
    let source = StaticCreatureSource::new(vec![
        CreatureDescriptor::new("1", "bulbasaur"),
        CreatureDescriptor::new("4", "charmander"),
        CreatureDescriptor::new("7", "squirtle"),
    ]);
    let config = GameConfig {
        max_batch_offset: 0,
        ..GameConfig::default()
    };

    let deps = MapSessionDeps::new(Arc::new(source), provider.clone());
    let mut session = MapSession::launch(&TokioSpawner::new(), config, deps)?;
    let map = session.handle();

    let snapshot = map.snapshot().await?;
    for spawn in &snapshot.spawns {
        println!(
            "{} is {:.0}m away",
            spawn.display_name,
            home.distance_to(&spawn.position)
        );
    }
    let target = snapshot
        .spawns
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("nothing spawned"))?;

    // walk straight onto the target in five steps
    for step in 1..=5 {
        let t = f64::from(step) / 5.0;
        let position = Coordinate::new(
            home.latitude + (target.position.latitude - home.latitude) * t,
            home.longitude + (target.position.longitude - home.longitude) * t,
        );
        provider.push(PositionSample::now(position));
    }
    map.snapshot().await?;

    for notice in session.drain_notices() {
        if let MapNotice::Controller(event) = notice {
            println!("map: {event:?}");
        }
    }

    let user = UserId::new("trainer");
    let ledger = Arc::new(InMemoryLedger::default());
    ledger.register(&user);
    let mailbox = AckMailbox::new();

    let spawn = map.begin_capture(target.spawn_id).await?;
    let capture = CaptureDeps::new(
        Arc::new(MockArScene::new()),
        Arc::new(MockPhotoSink::new()),
        ledger.clone(),
        Arc::new(StaticIdentity::signed_in(user.clone())),
    )
    .with_mailbox(mailbox.clone());
    let outcome = start_capture(spawn, capture).await;
    println!("capture: {outcome:?}");

    let dispositions = map.apply_mailbox(&mailbox).await?;
    println!("acknowledgements: {dispositions:?}");

    let record = ledger.get_record(&user).await?;
    println!(
        "{user}: level {}, {} xp, {} captures",
        record.level, record.xp, record.capture_count
    );

    map.shutdown().await?;
    Ok(())
}
