//! Spawner for tests
//!
//! Either discards spawned tasks, which makes a map session look like it
//! died immediately, or runs them to completion on the calling thread.

use super::{TaskHandle, TaskSpawner};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;

/// What [`MockSpawner`] does with a spawned task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSpawnBehavior {
    /// Drop the task without polling it
    Drop,
    /// Run the task to completion before `spawn` returns
    BlockSync,
}

/// Spawner that never starts a real executor
#[derive(Clone, Debug)]
pub struct MockSpawner {
    behavior: MockSpawnBehavior,
    spawned: Arc<Mutex<Vec<&'static str>>>,
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpawner {
    /// A spawner that drops tasks
    pub fn new() -> Self {
        Self::with_behavior(MockSpawnBehavior::Drop)
    }

    pub fn with_behavior(behavior: MockSpawnBehavior) -> Self {
        Self {
            behavior,
            spawned: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A spawner that runs tasks inline
    pub fn blocking() -> Self {
        Self::with_behavior(MockSpawnBehavior::BlockSync)
    }

    /// Names of every task handed to this spawner and its clones
    pub fn spawned(&self) -> Vec<&'static str> {
        self.spawned.lock().clone()
    }
}

impl TaskSpawner for MockSpawner {
    fn spawn<F>(&self, name: &'static str, task: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawned.lock().push(name);
        match self.behavior {
            MockSpawnBehavior::Drop => drop(task),
            MockSpawnBehavior::BlockSync => futures::executor::block_on(task),
        }
        TaskHandle::new(name, ())
    }

    fn runtime_name(&self) -> &'static str {
        "Mock"
    }

    fn block_on<F, T>(&self, future: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        match self.behavior {
            MockSpawnBehavior::Drop => None,
            MockSpawnBehavior::BlockSync => Some(futures::executor::block_on(future)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_dropped_task_never_runs() {
        let spawner = MockSpawner::new();
        spawner.spawn("doomed", async {
            panic!("dropped task was polled");
        });
        assert_eq!(spawner.spawned(), vec!["doomed"]);
    }

    #[test]
    fn test_blocking_runs_inline() {
        let spawner = MockSpawner::blocking();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        spawner.clone().spawn("inline", async move {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(ran.load(Ordering::SeqCst));
        assert_eq!(spawner.spawned(), vec!["inline"]);
    }

    #[test]
    fn test_block_on_support() {
        assert_eq!(MockSpawner::blocking().block_on(async { 3 }), Some(3));
        assert_eq!(MockSpawner::new().block_on(async { 3 }), None);
    }
}
