//! Spawn placement around an anchor coordinate
//!
//! A spawn is one placement of one creature species. Every placement gets
//! its own [`SpawnId`], so two spawns of the same species are never confused
//! with each other, even across regenerations.

use crate::geo::{meters_to_degrees, Coordinate};
use crate::source::CreatureDescriptor;
use glam::DVec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound on the per-axis placement offset
pub const MAX_SPREAD_DEGREES: f64 = 180.0;

/// Unique identifier of a single spawn instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpawnId(Uuid);

impl SpawnId {
    /// Allocate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SpawnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SpawnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spawn-{}", self.0)
    }
}

impl std::str::FromStr for SpawnId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("spawn-").unwrap_or(s);
        Uuid::parse_str(raw).map(Self)
    }
}

/// A creature placed on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnInstance {
    pub spawn_id: SpawnId,
    /// Species identifier of the creature this spawn shows
    pub creature_id: String,
    pub position: Coordinate,
    pub display_name: String,
    pub sprite_url: String,
}

impl SpawnInstance {
    fn place(creature: &CreatureDescriptor, position: Coordinate) -> Self {
        Self {
            spawn_id: SpawnId::new(),
            creature_id: creature.stable_id.clone(),
            position,
            display_name: creature.display_name.clone(),
            sprite_url: creature.sprite_url.clone(),
        }
    }
}

/// Scatters creatures uniformly in a square around an anchor
///
/// The square's half-width is the spawn radius converted to degrees and is
/// applied independently to latitude and longitude.
#[derive(Debug, Clone)]
pub struct SpawnGenerator {
    spawn_radius_meters: f64,
    rng: StdRng,
}

impl SpawnGenerator {
    /// Create a generator seeded from system entropy
    pub fn new(spawn_radius_meters: f64) -> Self {
        Self::with_rng(spawn_radius_meters, StdRng::from_entropy())
    }

    /// Create a generator with a fixed seed for reproducible placement
    pub fn with_seed(spawn_radius_meters: f64, seed: u64) -> Self {
        Self::with_rng(spawn_radius_meters, StdRng::seed_from_u64(seed))
    }

    /// Negative, NaN and infinite radii place every spawn on the anchor.
    fn with_rng(spawn_radius_meters: f64, rng: StdRng) -> Self {
        let spawn_radius_meters = if spawn_radius_meters.is_finite() {
            spawn_radius_meters.max(0.0)
        } else {
            0.0
        };
        Self {
            spawn_radius_meters,
            rng,
        }
    }

    pub fn spawn_radius_meters(&self) -> f64 {
        self.spawn_radius_meters
    }

    /// Maximum per-axis offset from the anchor in degrees
    pub fn spread_degrees(&self) -> f64 {
        meters_to_degrees(self.spawn_radius_meters).min(MAX_SPREAD_DEGREES)
    }

    /// Place one spawn per creature around `anchor`
    ///
    /// An empty batch yields an empty result.
    pub fn generate(
        &mut self,
        anchor: Coordinate,
        creatures: &[CreatureDescriptor],
    ) -> Vec<SpawnInstance> {
        let spread = self.spread_degrees();

        creatures
            .iter()
            .map(|creature| {
                let offset = DVec2::new(
                    self.rng.gen_range(-spread..=spread),
                    self.rng.gen_range(-spread..=spread),
                );
                let spawn = SpawnInstance::place(creature, anchor.offset_degrees(offset));
                log::debug!(
                    "- {} ({}) as {} at {}",
                    spawn.display_name,
                    spawn.creature_id,
                    spawn.spawn_id,
                    spawn.position
                );
                spawn
            })
            .collect()
    }
}

/// Place one spawn per creature around `anchor` using an entropy-seeded generator
pub fn generate_spawns(
    anchor: Coordinate,
    creatures: &[CreatureDescriptor],
    spawn_radius_meters: f64,
) -> Vec<SpawnInstance> {
    SpawnGenerator::new(spawn_radius_meters).generate(anchor, creatures)
}
