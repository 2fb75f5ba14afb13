//! Mock AR scene and photo sink for testing
//!
//! Neither mock touches the filesystem or a camera; they record what they
//! were asked to do and can be told to fail.

use super::{ArScene, CaptureFailure, PhotoArtifact, PhotoSink, SavedPhoto};
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// AR scene that hands out synthetic photos
#[derive(Debug)]
pub struct MockArScene {
    ready: AtomicBool,
    displayed: Mutex<Vec<String>>,
    photo_failure: Mutex<Option<CaptureFailure>>,
    photos_taken: AtomicUsize,
}

impl Default for MockArScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MockArScene {
    /// A ready scene
    pub fn new() -> Self {
        Self {
            ready: AtomicBool::new(true),
            displayed: Mutex::new(Vec::new()),
            photo_failure: Mutex::new(None),
            photos_taken: AtomicUsize::new(0),
        }
    }

    /// A scene that never becomes ready but still takes photos
    pub fn not_ready() -> Self {
        let scene = Self::new();
        scene.set_ready(false);
        scene
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Make the next photo fail with `failure`
    pub fn fail_next_photo(&self, failure: CaptureFailure) {
        *self.photo_failure.lock() = Some(failure);
    }

    /// Creature ids shown so far
    pub fn displayed(&self) -> Vec<String> {
        self.displayed.lock().clone()
    }

    pub fn photos_taken(&self) -> usize {
        self.photos_taken.load(Ordering::Relaxed)
    }
}

#[async_trait::async_trait]
impl ArScene for MockArScene {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn display(&self, creature_id: &str, _sprite_url: &str) -> Result<(), CaptureFailure> {
        if !self.is_ready() {
            return Err(CaptureFailure::ArUnavailable("tracking not started".into()));
        }
        self.displayed.lock().push(creature_id.to_owned());
        Ok(())
    }

    async fn take_photo(&self) -> Result<PhotoArtifact, CaptureFailure> {
        if let Some(failure) = self.photo_failure.lock().take() {
            return Err(failure);
        }
        let n = self.photos_taken.fetch_add(1, Ordering::Relaxed);
        Ok(PhotoArtifact::new(
            std::env::temp_dir().join(format!("ar-snapshot-{n}.jpg")),
        ))
    }
}

/// Photo sink that records saves in memory
#[derive(Debug, Default)]
pub struct MockPhotoSink {
    saved: Mutex<Vec<PathBuf>>,
    failure: Mutex<Option<CaptureFailure>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MockPhotoSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every save with `failure`
    pub fn failing(failure: CaptureFailure) -> Self {
        let sink = Self::new();
        sink.set_failure(Some(failure));
        sink
    }

    /// A sink whose first save waits until the returned sender fires
    pub fn gated() -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self::new();
        *sink.gate.lock() = Some(rx);
        (sink, tx)
    }

    pub fn set_failure(&self, failure: Option<CaptureFailure>) {
        *self.failure.lock() = failure;
    }

    /// Locations of every photo saved so far
    pub fn saved(&self) -> Vec<PathBuf> {
        self.saved.lock().clone()
    }
}

#[async_trait::async_trait]
impl PhotoSink for MockPhotoSink {
    async fn save(&self, photo: &PhotoArtifact) -> Result<SavedPhoto, CaptureFailure> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        if let Some(failure) = self.failure.lock().clone() {
            return Err(failure);
        }

        let location = PathBuf::from("album").join(&photo.file_name);
        self.saved.lock().push(location.clone());
        Ok(SavedPhoto::new(location))
    }
}
