//! Task spawning abstraction
//!
//! The map session runs as one long-lived background task. Where that task
//! runs is decided by a [`TaskSpawner`], so the core does not depend on a
//! particular executor and tests can swap in [`MockSpawner`].

pub mod mock;
#[cfg(feature = "runtime-tokio")]
pub mod tokio_impl;

use std::fmt::Debug;
use std::future::Future;

/// Handle to a spawned task
///
/// The executor-specific handle is type-erased; recover it with
/// [`downcast`](Self::downcast).
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    inner: Box<dyn std::any::Any + Send>,
}

impl TaskHandle {
    pub fn new<T: Send + 'static>(name: &'static str, handle: T) -> Self {
        Self {
            name,
            inner: Box::new(handle),
        }
    }

    /// Name the task was spawned under
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn downcast<T: 'static>(self) -> Option<T> {
        self.inner.downcast::<T>().ok().map(|b| *b)
    }
}

/// Runs background tasks for a map session
///
/// # Example
/// ```ignore
/// let spawner = TokioSpawner::new();
/// spawner.spawn("map-session", async {
///     // event loop
/// });
/// ```
pub trait TaskSpawner: Send + Sync + Clone + Debug {
    /// Start `task` in the background
    fn spawn<F>(&self, name: &'static str, task: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static;

    /// Executor name for log messages
    fn runtime_name(&self) -> &'static str;

    /// Drive `future` to completion on the current thread, if supported
    fn block_on<F, T>(&self, _future: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        None
    }
}

pub use mock::MockSpawner;

#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::TokioSpawner;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_keeps_name() {
        let handle = TaskHandle::new("map-session", 7u8);
        assert_eq!(handle.name(), "map-session");
        assert_eq!(handle.downcast::<u8>(), Some(7));
    }

    #[test]
    fn test_handle_wrong_type() {
        let handle = TaskHandle::new("map-session", 7u8);
        assert!(handle.downcast::<String>().is_none());
    }
}
