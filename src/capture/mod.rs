//! Capture sessions
//!
//! A [`CaptureSession`] shows one spawn's creature in an AR scene and turns a
//! shutter press into a saved photo plus a progression reward. The order is
//! fixed: photo, then persistence, then reward. Nothing is granted or
//! acknowledged unless the photo was persisted.
//!
//! # Example
//!
//! ```no_run
//! use spawnfence::capture::{CaptureDeps, CaptureSession};
//! # async fn run(spawn: spawnfence::SpawnInstance, deps: CaptureDeps) {
//! let session = CaptureSession::open(spawn, deps).await;
//! let outcome = session.shutter().await;
//! if let Some(ack) = outcome.acknowledgement() {
//!     println!("caught {}", ack.captured_creature_id);
//! }
//! # }
//! ```

pub mod mock;

#[cfg(feature = "runtime-tokio")]
mod album;

#[cfg(feature = "runtime-tokio")]
pub use album::AlbumPhotoSink;

use crate::ledger::{IdentityProvider, ProgressionLedger, ProgressionRecord};
use crate::lifecycle::{AckMailbox, CaptureAck};
use crate::metrics::SessionMetricsHandle;
use crate::spawn::{SpawnId, SpawnInstance};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Why a shutter press did not produce a capture
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureFailure {
    #[error("AR scene unavailable: {0}")]
    ArUnavailable(String),

    #[error("Photo library permission denied")]
    PermissionDenied,

    #[error("Failed to save photo: {0}")]
    SaveFailed(String),

    #[error("Failed to take photo: {0}")]
    Photo(String),

    #[error("A capture is already being processed")]
    Busy,

    #[error("This capture session already succeeded")]
    AlreadyCompleted,
}

/// A photo taken by the AR scene, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoArtifact {
    /// Where the scene wrote the photo
    pub path: PathBuf,
    /// Name the photo gets when saved
    pub file_name: String,
}

impl PhotoArtifact {
    /// Wrap a freshly taken photo and give it a random file name
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_owned();
        Self {
            path,
            file_name: format!("{}.{extension}", Uuid::new_v4()),
        }
    }
}

/// A photo persisted by a [`PhotoSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPhoto {
    pub location: PathBuf,
}

impl SavedPhoto {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }
}

/// What happened to the reward of a successful capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardStatus {
    Applied(ProgressionRecord),
    /// The photo stays saved; only the reward was lost
    Failed(String),
    /// Nobody is signed in
    NoIdentity,
}

impl RewardStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Result of one shutter press
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Success {
        spawn_id: SpawnId,
        creature_id: String,
        photo: SavedPhoto,
        reward: RewardStatus,
    },
    Failure {
        reason: CaptureFailure,
    },
}

impl CaptureOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Token for the map screen, present only on success
    pub fn acknowledgement(&self) -> Option<CaptureAck> {
        match self {
            Self::Success {
                spawn_id,
                creature_id,
                ..
            } => Some(CaptureAck::new(*spawn_id, creature_id.clone())),
            Self::Failure { .. } => None,
        }
    }

    fn failed(reason: CaptureFailure) -> Self {
        Self::Failure { reason }
    }
}

/// AR view that shows a creature and photographs it
#[async_trait::async_trait]
pub trait ArScene: Send + Sync {
    /// Whether the AR session is tracking and can render
    fn is_ready(&self) -> bool;

    /// Place the creature's sprite in the scene
    async fn display(&self, creature_id: &str, sprite_url: &str) -> Result<(), CaptureFailure>;

    /// Capture the current view
    async fn take_photo(&self) -> Result<PhotoArtifact, CaptureFailure>;
}

/// Device storage for capture photos
#[async_trait::async_trait]
pub trait PhotoSink: Send + Sync {
    async fn save(&self, photo: &PhotoArtifact) -> Result<SavedPhoto, CaptureFailure>;
}

/// Collaborators a capture session needs
#[derive(Clone)]
pub struct CaptureDeps {
    pub scene: Arc<dyn ArScene>,
    pub sink: Arc<dyn PhotoSink>,
    pub ledger: Arc<dyn ProgressionLedger>,
    pub identity: Arc<dyn IdentityProvider>,
    pub metrics: SessionMetricsHandle,
    /// Where successful captures post their acknowledgement
    pub mailbox: Option<AckMailbox>,
}

impl CaptureDeps {
    pub fn new(
        scene: Arc<dyn ArScene>,
        sink: Arc<dyn PhotoSink>,
        ledger: Arc<dyn ProgressionLedger>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            scene,
            sink,
            ledger,
            identity,
            metrics: SessionMetricsHandle::new(),
            mailbox: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SessionMetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_mailbox(mut self, mailbox: AckMailbox) -> Self {
        self.mailbox = Some(mailbox);
        self
    }
}

impl std::fmt::Debug for CaptureDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureDeps")
            .field("scene_ready", &self.scene.is_ready())
            .field("mailbox", &self.mailbox)
            .finish_non_exhaustive()
    }
}

/// One capture screen for one spawn
#[derive(Debug)]
pub struct CaptureSession {
    spawn: SpawnInstance,
    deps: CaptureDeps,
    busy: AtomicBool,
    completed: AtomicBool,
}

impl CaptureSession {
    /// Open the capture screen and show the creature
    ///
    /// A scene that is not ready, or fails to display, is logged and the
    /// session continues.
    pub async fn open(spawn: SpawnInstance, deps: CaptureDeps) -> Self {
        if !deps.scene.is_ready() {
            log::warn!(
                "AR scene not ready for {} ({}), continuing",
                spawn.display_name,
                spawn.spawn_id
            );
        }
        if let Err(e) = deps
            .scene
            .display(&spawn.creature_id, &spawn.sprite_url)
            .await
        {
            log::warn!("Could not display {} in AR: {}", spawn.display_name, e);
        }

        Self {
            spawn,
            deps,
            busy: AtomicBool::new(false),
            completed: AtomicBool::new(false),
        }
    }

    pub fn spawn(&self) -> &SpawnInstance {
        &self.spawn
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Handle a shutter press
    ///
    /// Overlapping presses get `Busy`; presses after a success get
    /// `AlreadyCompleted`. A failure leaves the session open for a retry.
    pub async fn shutter(&self) -> CaptureOutcome {
        if self.busy.swap(true, Ordering::SeqCst) {
            return CaptureOutcome::failed(CaptureFailure::Busy);
        }
        let outcome = if self.is_completed() {
            CaptureOutcome::failed(CaptureFailure::AlreadyCompleted)
        } else {
            self.capture().await
        };
        self.busy.store(false, Ordering::SeqCst);
        outcome
    }

    async fn capture(&self) -> CaptureOutcome {
        let spawn = &self.spawn;
        if !self.deps.scene.is_ready() {
            log::warn!("AR scene not ready, taking photo of {} anyway", spawn.spawn_id);
        }

        let photo = match self.deps.scene.take_photo().await {
            Ok(photo) => photo,
            Err(reason) => {
                log::warn!("Capture of {} failed: {}", spawn.spawn_id, reason);
                return CaptureOutcome::failed(reason);
            }
        };

        let saved = match self.deps.sink.save(&photo).await {
            Ok(saved) => saved,
            Err(reason) => {
                log::warn!("Capture of {} failed: {}", spawn.spawn_id, reason);
                return CaptureOutcome::failed(reason);
            }
        };

        self.completed.store(true, Ordering::SeqCst);
        log::info!(
            "Saved capture of {} to {}",
            spawn.display_name,
            saved.location.display()
        );

        let reward = self.grant_reward().await;
        let outcome = CaptureOutcome::Success {
            spawn_id: spawn.spawn_id,
            creature_id: spawn.creature_id.clone(),
            photo: saved,
            reward,
        };

        if let (Some(mailbox), Some(ack)) = (&self.deps.mailbox, outcome.acknowledgement()) {
            mailbox.post(ack);
        }
        outcome
    }

    async fn grant_reward(&self) -> RewardStatus {
        let Some(user) = self.deps.identity.current_user() else {
            log::error!(
                "Reward for {} not applied: no signed-in user",
                self.spawn.spawn_id
            );
            self.deps.metrics.record_reward_failed();
            return RewardStatus::NoIdentity;
        };

        match self.deps.ledger.apply_capture_reward(&user).await {
            Ok(record) => {
                self.deps.metrics.record_reward_applied();
                RewardStatus::Applied(record)
            }
            Err(e) => {
                log::error!(
                    "Reward for {} not applied, photo kept: {}",
                    self.spawn.spawn_id,
                    e
                );
                self.deps.metrics.record_reward_failed();
                RewardStatus::Failed(e.to_string())
            }
        }
    }
}

/// Open a session for `spawn` and press the shutter once
pub async fn start_capture(spawn: SpawnInstance, deps: CaptureDeps) -> CaptureOutcome {
    CaptureSession::open(spawn, deps).await.shutter().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_gets_random_name() {
        let a = PhotoArtifact::new("/tmp/shot.png");
        let b = PhotoArtifact::new("/tmp/shot.png");
        assert_ne!(a.file_name, b.file_name);
        assert!(a.file_name.ends_with(".png"));
        assert!(PhotoArtifact::new("/tmp/shot").file_name.ends_with(".jpg"));
    }

    #[test]
    fn test_failure_has_no_acknowledgement() {
        let outcome = CaptureOutcome::failed(CaptureFailure::PermissionDenied);
        assert!(!outcome.is_success());
        assert_eq!(outcome.acknowledgement(), None);
    }
}
