//! Tokio spawner

use super::{TaskHandle, TaskSpawner};
use std::future::Future;

/// Spawns onto the ambient Tokio runtime
///
/// Must be used from inside a runtime context.
#[derive(Clone, Debug, Default, Copy)]
pub struct TokioSpawner;

impl TokioSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, name: &'static str, task: F) -> TaskHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        log::debug!("Spawning {name} on Tokio");
        TaskHandle::new(name, tokio::spawn(task))
    }

    fn runtime_name(&self) -> &'static str {
        "Tokio"
    }

    fn block_on<F, T>(&self, future: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(tokio::task::block_in_place(|| handle.block_on(future))),
            Err(_) => {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .ok()?;
                Some(rt.block_on(future))
            }
        }
    }
}
