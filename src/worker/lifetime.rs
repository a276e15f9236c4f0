//! Lifetime extension for background work spawned by event handlers

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinSet;

/// Tracks work that must finish before the worker may be dropped.
///
/// Handlers return as soon as the page has its answer; anything still running
/// (revalidation, cache writes) is registered here and awaited by [`settle`].
///
/// [`settle`]: Lifetime::settle
#[derive(Debug, Default)]
pub struct Lifetime {
    tasks: Mutex<JoinSet<()>>,
}

impl Lifetime {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Keep the worker alive until `work` completes.
    /// Finished tasks are reaped on each registration.
    pub fn wait_until<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks();
        while let Some(joined) = tasks.try_join_next() {
            if let Err(e) = joined {
                log::warn!("Background task failed: {}", e);
            }
        }
        tasks.spawn(work);
    }

    /// Number of registered tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks().len()
    }

    /// Await all registered work, including work registered while settling.
    pub async fn settle(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.tasks());
            if batch.is_empty() {
                return;
            }
            while let Some(joined) = batch.join_next().await {
                if let Err(e) = joined {
                    log::warn!("Background task failed: {}", e);
                }
            }
        }
    }
}
