//! Benchmark: geofence evaluation per location sample

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spawnfence::{meters_to_degrees, Coordinate, CreatureDescriptor, ProximityTracker, SpawnGenerator};

fn proximity_benchmark(c: &mut Criterion) {
    let anchor = Coordinate::new(10.0, 123.0);
    let creatures: Vec<_> = (0..100)
        .map(|i| CreatureDescriptor::new(i.to_string(), format!("creature-{i}")))
        .collect();
    let spawns = SpawnGenerator::with_seed(50.0, 7).generate(anchor, &creatures);

    c.bench_function("evaluate_stationary_100", |b| {
        let mut tracker = ProximityTracker::new(10.0);
        b.iter(|| black_box(tracker.evaluate(anchor, &spawns)))
    });

    // alternate between two points so membership keeps changing
    let away = Coordinate::new(anchor.latitude + meters_to_degrees(40.0), anchor.longitude);
    c.bench_function("evaluate_walking_100", |b| {
        let mut tracker = ProximityTracker::new(10.0);
        let mut flip = false;
        b.iter(|| {
            flip = !flip;
            let position = if flip { anchor } else { away };
            black_box(tracker.evaluate(position, &spawns))
        })
    });
}

criterion_group!(benches, proximity_benchmark);
criterion_main!(benches);
