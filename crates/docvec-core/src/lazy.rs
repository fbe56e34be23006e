//! Build-once, share-everywhere service container.
//!
//! Concurrent first callers await a single in-flight construction; a failed
//! construction leaves the cell empty so the next caller retries.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::Result;

pub struct SharedService<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> SharedService<T> {
    pub fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let value = self.cell.get_or_try_init(|| async move { init().await.map(Arc::new) }).await?;
        Ok(Arc::clone(value))
    }

    pub fn get(&self) -> Option<Arc<T>> {
        self.cell.get().cloned()
    }
}

impl<T> Default for SharedService<T> {
    fn default() -> Self {
        Self::new()
    }
}
