//! Geofence membership tracking
//!
//! Turns a stream of user positions into Enter/Exit transitions against the
//! current spawn set. Membership is explicit state owned by
//! [`ProximityTracker`] and only changes inside [`evaluate`].

use crate::geo::{distance_meters, Coordinate};
use crate::spawn::{SpawnId, SpawnInstance};
use std::collections::HashSet;

/// Default geofence radius around each spawn
pub const DEFAULT_CAPTURE_RADIUS_METERS: f64 = 10.0;

/// A change in the user's inside/outside status for one spawn
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionEvent {
    Enter(SpawnInstance),
    Exit(SpawnInstance),
}

impl TransitionEvent {
    pub fn spawn(&self) -> &SpawnInstance {
        match self {
            Self::Enter(spawn) | Self::Exit(spawn) => spawn,
        }
    }

    pub fn spawn_id(&self) -> SpawnId {
        self.spawn().spawn_id
    }

    pub fn is_enter(&self) -> bool {
        matches!(self, Self::Enter(_))
    }
}

/// Classify every spawn against `position` and update `membership`
///
/// A spawn is inside when its distance is at most `radius_meters`. Events
/// are emitted only for spawns whose status differs from `membership`, so
/// repeated calls with the same inputs emit nothing.
pub fn evaluate(
    position: Coordinate,
    spawns: &[SpawnInstance],
    radius_meters: f64,
    membership: &mut HashSet<SpawnId>,
) -> Vec<TransitionEvent> {
    let mut events = Vec::new();

    for spawn in spawns {
        let distance = distance_meters(position, spawn.position);
        let inside = distance <= radius_meters;
        let was_inside = membership.contains(&spawn.spawn_id);

        if inside && !was_inside {
            membership.insert(spawn.spawn_id);
            log::debug!(
                "Entered geofence for {} ({}) at {:.1}m",
                spawn.display_name,
                spawn.spawn_id,
                distance
            );
            events.push(TransitionEvent::Enter(spawn.clone()));
        } else if !inside && was_inside {
            membership.remove(&spawn.spawn_id);
            log::debug!(
                "Left geofence for {} ({}) at {:.1}m",
                spawn.display_name,
                spawn.spawn_id,
                distance
            );
            events.push(TransitionEvent::Exit(spawn.clone()));
        }
    }

    events
}

/// Owns the set of spawns the user is currently inside
#[derive(Debug, Clone)]
pub struct ProximityTracker {
    radius_meters: f64,
    membership: HashSet<SpawnId>,
    active: bool,
}

impl Default for ProximityTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPTURE_RADIUS_METERS)
    }
}

impl ProximityTracker {
    pub fn new(radius_meters: f64) -> Self {
        Self {
            radius_meters,
            membership: HashSet::new(),
            active: true,
        }
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    /// Evaluate one position sample; a shut-down tracker emits nothing
    pub fn evaluate(
        &mut self,
        position: Coordinate,
        spawns: &[SpawnInstance],
    ) -> Vec<TransitionEvent> {
        if !self.active {
            return Vec::new();
        }
        evaluate(position, spawns, self.radius_meters, &mut self.membership)
    }

    /// Current membership, read-only
    pub fn membership(&self) -> &HashSet<SpawnId> {
        &self.membership
    }

    pub fn is_inside(&self, spawn_id: &SpawnId) -> bool {
        self.membership.contains(spawn_id)
    }

    /// Drop a single spawn from membership without emitting an Exit
    pub fn forget(&mut self, spawn_id: &SpawnId) -> bool {
        self.membership.remove(spawn_id)
    }

    /// Drop all membership, e.g. when the spawn set is replaced
    pub fn reset(&mut self) {
        self.membership.clear();
    }

    /// Stop tracking: clear membership and ignore further samples
    pub fn shutdown(&mut self) {
        self.membership.clear();
        self.active = false;
    }

    /// Resume after [`shutdown`](Self::shutdown) with empty membership
    pub fn resume(&mut self) {
        self.membership.clear();
        self.active = true;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
