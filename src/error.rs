//! Error types for spawnfence

use crate::spawn::SpawnId;
use thiserror::Error;

/// Main error type for spawn and capture operations
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Creature source error: {0}")]
    Source(#[from] crate::source::SourceError),

    #[error("Location error: {0}")]
    Location(#[from] crate::location::LocationError),

    #[error("Capture failed: {0}")]
    Capture(#[from] crate::capture::CaptureFailure),

    #[error("Ledger error: {0}")]
    Ledger(#[from] crate::ledger::LedgerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No anchor position is known yet")]
    NoAnchor,

    #[error("No open capture opportunity for spawn {0}")]
    NoOpportunity(SpawnId),

    #[error("A capture is already in progress for spawn {0}")]
    CaptureInProgress(SpawnId),

    #[error("Map session is closed")]
    SessionClosed,
}

/// Result type alias for spawnfence operations
pub type Result<T> = std::result::Result<T, GameError>;
