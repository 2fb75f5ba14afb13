//! Capture acknowledgements passed from the capture screen back to the map

use crate::spawn::SpawnId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;

/// Token identifying which spawn a finished capture session caught
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureAck {
    pub captured_spawn_id: SpawnId,
    pub captured_creature_id: String,
}

impl CaptureAck {
    pub fn new(captured_spawn_id: SpawnId, captured_creature_id: impl Into<String>) -> Self {
        Self {
            captured_spawn_id,
            captured_creature_id: captured_creature_id.into(),
        }
    }
}

/// Shared queue of acknowledgements between two screens
///
/// Each posted token is handed out once: [`take`](Self::take) removes it, so
/// a replayed read finds nothing.
#[derive(Debug, Clone, Default)]
pub struct AckMailbox {
    queue: Arc<Mutex<VecDeque<CaptureAck>>>,
}

impl AckMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, ack: CaptureAck) {
        self.queue.lock().push_back(ack);
    }

    /// Remove and return the oldest pending token
    pub fn take(&self) -> Option<CaptureAck> {
        self.queue.lock().pop_front()
    }

    /// Return an undelivered token to the front of the queue
    pub fn requeue(&self, ack: CaptureAck) {
        self.queue.lock().push_front(ack);
    }

    /// Remove and return every pending token
    pub fn drain(&self) -> Vec<CaptureAck> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
