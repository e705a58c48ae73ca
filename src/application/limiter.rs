use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::domain::AppError;

/// Caps how many jobs run at once.
///
/// Backed by a fair semaphore, so callers waiting for a slot are served in
/// the order they called [`ConcurrencyLimiter::schedule`].
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyLimiter {
    pub fn new(concurrency: usize) -> Result<Self, AppError> {
        if concurrency == 0 {
            return Err(AppError::Input("concurrency must be at least 1".to_string()));
        }
        Ok(Self {
            slots: Arc::new(Semaphore::new(concurrency)),
            capacity: concurrency,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Waits for a free slot, then spawns `task` holding it.
    ///
    /// The slot is released as soon as the task settles. The returned handle
    /// resolves to the task's own output.
    pub async fn schedule<F>(&self, task: F) -> Result<JoinHandle<F::Output>, AppError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Input(format!("concurrency limiter closed: {}", e)))?;

        Ok(tokio::spawn(async move {
            let _permit = permit;
            task.await
        }))
    }
}
