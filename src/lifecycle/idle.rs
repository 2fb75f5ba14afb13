//! Stationary-user detection for automatic respawns

use crate::geo::{distance_meters, Coordinate};
use std::time::{Duration, Instant};

/// Tracks how long the user has stayed near one spot
///
/// Movement further than the settle threshold from the settled spot moves
/// the spot and restarts the clock.
#[derive(Debug, Clone)]
pub struct IdleWatch {
    settle_threshold_meters: f64,
    idle_after: Duration,
    settled: Option<(Coordinate, Instant)>,
}

impl IdleWatch {
    pub fn new(settle_threshold_meters: f64, idle_after: Duration) -> Self {
        Self {
            settle_threshold_meters,
            idle_after,
            settled: None,
        }
    }

    /// Feed a position sample
    pub fn observe(&mut self, position: Coordinate, at: Instant) {
        match self.settled {
            Some((spot, _)) if distance_meters(spot, position) <= self.settle_threshold_meters => {}
            _ => self.settled = Some((position, at)),
        }
    }

    /// Restart the clock at `position`
    pub fn reset(&mut self, position: Coordinate, at: Instant) {
        self.settled = Some((position, at));
    }

    pub fn clear(&mut self) {
        self.settled = None;
    }

    /// The user has been settled for at least the idle duration
    pub fn is_due(&self, now: Instant) -> bool {
        self.settled
            .map(|(_, since)| now.saturating_duration_since(since) >= self.idle_after)
            .unwrap_or(false)
    }

    pub fn settled_spot(&self) -> Option<Coordinate> {
        self.settled.map(|(spot, _)| spot)
    }
}
