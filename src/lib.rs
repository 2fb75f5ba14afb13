//! spawnfence - Geofenced creature spawns and captures for location-based games
//!
//! # Features
//! - Uniform random spawn placement around the player (seedable)
//! - Explicit geofence membership with strictly alternating Enter/Exit
//! - Spawn lifecycle controller with manual and idle regeneration
//! - Idempotent capture acknowledgements between map and capture screens
//! - Capture sessions that reward only after the photo is persisted
//! - Trait seams for location, creature data, AR, storage and progression
//!
//! # Quick Start
//!
//! ```
//! use spawnfence::{Coordinate, CreatureDescriptor, GameConfig, PositionSample,
//!     SpawnGenerator, SpawnLifecycleController};
//! use std::time::Instant;
//!
//! let config = GameConfig::default();
//! let mut controller =
//!     SpawnLifecycleController::with_generator(&config, SpawnGenerator::with_seed(50.0, 1));
//!
//! let now = Instant::now();
//! controller.on_creatures_ready(vec![CreatureDescriptor::new("25", "pikachu")], now);
//! controller.on_anchor_ready(Coordinate::new(10.0, 123.0), now);
//!
//! let spawn = controller.spawns()[0].clone();
//! let events = controller.on_position(PositionSample::new(spawn.position, now));
//! assert_eq!(events.len(), 1);
//! ```
//!
//! # Feature Flags
//!
//! - `runtime-tokio` (default): Tokio spawner, [`session::MapSession`] driver
//!   and the filesystem photo sink
//! - `http-source`: PokeAPI creature list adapter

// Core modules
pub mod geo;
pub mod lifecycle;
pub mod proximity;
pub mod spawn;

// Collaborator seams
pub mod capture;
pub mod ledger;
pub mod location;
pub mod runtime;
pub mod source;

#[cfg(feature = "runtime-tokio")]
pub mod session;

// Support modules
pub mod config;
pub mod metrics;

// Error types
mod error;
pub use error::{GameError, Result};

pub use config::{GameConfig, LocationOptions, RewardPolicy};
pub use metrics::{SessionMetrics, SessionMetricsHandle};

// Re-export geo and placement types
pub use geo::{distance_meters, meters_to_degrees, Coordinate, EARTH_RADIUS_METERS};
pub use proximity::{ProximityTracker, TransitionEvent};
pub use spawn::{generate_spawns, SpawnGenerator, SpawnId, SpawnInstance};

// Re-export lifecycle types
pub use lifecycle::{
    AckDisposition, AckMailbox, CaptureAck, CaptureOpportunity, ControllerEvent,
    RegenerationReason, SpawnLifecycleController, SpawnSetState, SpawnStatus,
};

// Re-export collaborator types
pub use capture::{
    ArScene, CaptureDeps, CaptureFailure, CaptureOutcome, CaptureSession, PhotoArtifact,
    PhotoSink, RewardStatus, SavedPhoto,
};
pub use ledger::{
    IdentityProvider, InMemoryLedger, LedgerError, ProgressionLedger, ProgressionRecord,
    StaticIdentity, UserId,
};
pub use location::{
    AnchorResolution, AnchorResolver, LocationCache, LocationError, LocationProvider,
    PositionSample,
};
pub use source::{CachedCreatureSource, CreatureDescriptor, CreatureSource, SourceError};

// Re-export runtime types
pub use runtime::mock::MockSpawner;
#[cfg(feature = "runtime-tokio")]
pub use runtime::tokio_impl::TokioSpawner;
pub use runtime::{TaskHandle, TaskSpawner};

// Version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
