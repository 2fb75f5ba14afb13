//! Device location
//!
//! The location provider is a seam: production code adapts the platform's
//! geolocation service, tests use [`mock::MockLocationProvider`]. Updates are
//! delivered as a stream of [`PositionSample`]s over a futures channel; the
//! subscription handle is returned to [`LocationProvider::unsubscribe`] when
//! the map goes away.

mod anchor;
pub mod mock;

pub use crate::config::LocationOptions;
pub use anchor::{AnchorResolution, AnchorResolver};

use crate::geo::Coordinate;
use futures::channel::mpsc::UnboundedReceiver;
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error type for location operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Timed out waiting for a location fix")]
    Timeout,

    #[error("Location services are disabled")]
    ServiceDisabled,

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// One reported user position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSample {
    pub coordinate: Coordinate,
    pub timestamp: Instant,
}

impl PositionSample {
    pub fn new(coordinate: Coordinate, timestamp: Instant) -> Self {
        Self {
            coordinate,
            timestamp,
        }
    }

    /// A sample taken right now
    pub fn now(coordinate: Coordinate) -> Self {
        Self::new(coordinate, Instant::now())
    }
}

/// Identifies one location subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Stream of location updates from one subscription
#[derive(Debug)]
pub struct LocationSubscription {
    pub handle: SubscriptionHandle,
    pub updates: UnboundedReceiver<Result<PositionSample, LocationError>>,
}

/// Platform geolocation service
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    /// One-shot fix honouring `options.timeout_ms`
    async fn current_position(
        &self,
        options: &LocationOptions,
    ) -> Result<PositionSample, LocationError>;

    /// Start continuous updates filtered by `options`
    fn subscribe(&self, options: &LocationOptions) -> Result<LocationSubscription, LocationError>;

    /// Stop updates for `handle`; unknown handles are ignored
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

/// Last known fix with an expiry
#[derive(Debug)]
pub struct LocationCache {
    ttl: Duration,
    last: Mutex<Option<PositionSample>>,
}

impl LocationCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            last: Mutex::new(None),
        }
    }

    /// Remember `sample` if it is newer than the cached one
    pub fn record(&self, sample: PositionSample) {
        let mut last = self.last.lock();
        match *last {
            Some(cached) if cached.timestamp > sample.timestamp => {}
            _ => *last = Some(sample),
        }
    }

    /// The cached fix if it is no older than the TTL at `now`
    pub fn fresh(&self, now: Instant) -> Option<PositionSample> {
        let last = *self.last.lock();
        last.filter(|s| now.saturating_duration_since(s.timestamp) <= self.ttl)
    }

    /// The cached fix regardless of age
    pub fn last(&self) -> Option<PositionSample> {
        *self.last.lock()
    }

    pub fn clear(&self) {
        *self.last.lock() = None;
    }
}
