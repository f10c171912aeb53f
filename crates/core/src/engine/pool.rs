//! Bounded pool of engine processes
//!
//! A fixed set of [`EngineClient`]s shared by any number of concurrent
//! callers. At most `size` analyses run at once; everyone else waits for a
//! slot in FIFO order.

use std::future::Future;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use super::analysis::Evaluation;
use super::stockfish::EngineClient;
use crate::config::EngineConfig;
use crate::error::{Error, Result};

struct PoolInner {
    /// Engines not checked out. Only touched together with a permit.
    idle: Mutex<Vec<EngineClient>>,
    slots: Arc<Semaphore>,
    size: usize,
}

/// Pool of UCI engine processes
pub struct EnginePool {
    inner: Arc<PoolInner>,
}

impl EnginePool {
    /// Spawns `size` engines from `path`
    pub async fn new(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        Self::spawn_all(path.as_ref(), size, None).await
    }

    /// Spawns the pool described by `config`
    pub async fn with_config(config: &EngineConfig) -> Result<Self> {
        Self::spawn_all(&config.engine_path, config.pool_size, config.search_timeout).await
    }

    async fn spawn_all(
        path: &Path,
        size: usize,
        search_timeout: Option<std::time::Duration>,
    ) -> Result<Self> {
        if size == 0 {
            return Err(Error::InvalidPoolSize);
        }

        let mut clients = Vec::with_capacity(size);
        for _ in 0..size {
            // An error here drops the engines spawned so far, killing them
            let client = EngineClient::spawn(path).await?;
            clients.push(client.with_search_timeout(search_timeout));
        }

        let pool = Self::from_clients(clients)?;
        info!(path = %path.display(), size, "engine pool ready");
        Ok(pool)
    }

    /// Builds a pool over already connected clients
    pub fn from_clients(clients: Vec<EngineClient>) -> Result<Self> {
        if clients.is_empty() {
            return Err(Error::InvalidPoolSize);
        }

        let size = clients.len();
        Ok(EnginePool {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(clients),
                slots: Arc::new(Semaphore::new(size)),
                size,
            }),
        })
    }

    /// Number of engines owned by the pool
    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Number of engines currently idle
    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().len()
    }

    /// Number of free checkout slots
    pub fn available(&self) -> usize {
        self.inner.slots.available_permits()
    }

    /// Waits for a free engine and checks it out.
    ///
    /// Cancelling the wait does not consume a slot. The engine goes back to
    /// the pool when the returned guard is dropped.
    pub async fn checkout(&self) -> Result<PooledEngine> {
        let permit = self
            .inner
            .slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::PoolClosed)?;

        let client = self.inner.idle.lock().pop();
        match client {
            Some(client) => {
                debug!(idle = self.idle_count(), "engine checked out");
                Ok(PooledEngine {
                    client: Some(client),
                    pool: self.inner.clone(),
                    permit: Some(permit),
                })
            }
            None => {
                // permit is released on return
                warn!("slot granted with no idle engine");
                Err(Error::PoolInvariant)
            }
        }
    }

    /// Runs `work` against an exclusively held engine.
    ///
    /// The engine is returned to the pool whether `work` succeeds, fails,
    /// panics or is cancelled.
    ///
    /// # Example
    /// ```ignore
    /// let eval = pool
    ///     .run(|engine| async move { engine.evaluate_position("startpos", Some(12), None).await })
    ///     .await?;
    /// ```
    pub async fn run<F, Fut, T, E>(&self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce(PooledEngine) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        let engine = self.checkout().await?;
        work(engine).await
    }

    /// Evaluates a position on the next free engine
    pub async fn evaluate_position(
        &self,
        fen: &str,
        depth: Option<u32>,
        move_time_ms: Option<u64>,
    ) -> Result<Evaluation> {
        self.run(|engine| async move { engine.evaluate_position(fen, depth, move_time_ms).await })
            .await
    }

    /// Evaluates the position after `mv` on the next free engine
    pub async fn evaluate_move(
        &self,
        fen: &str,
        mv: &str,
        depth: Option<u32>,
        move_time_ms: Option<u64>,
    ) -> Result<Evaluation> {
        self.run(|engine| async move { engine.evaluate_move(fen, mv, depth, move_time_ms).await })
            .await
    }

    /// Best move for a position, empty if the engine produced none
    pub async fn best_move(
        &self,
        fen: &str,
        depth: Option<u32>,
        move_time_ms: Option<u64>,
    ) -> Result<String> {
        self.run(|engine| async move { engine.best_move(fen, depth, move_time_ms).await })
            .await
    }

    /// Stops handing out engines and quits every idle one.
    ///
    /// Engines still checked out finish their current work and are killed
    /// when their guard drops.
    pub async fn shutdown(&self) {
        self.inner.slots.close();

        let idle: Vec<EngineClient> = std::mem::take(&mut *self.inner.idle.lock());
        let busy = self.inner.size - idle.len();
        if busy > 0 {
            warn!(busy, "shutting down with engines still in use");
        }

        for client in idle {
            client.quit().await;
        }
        info!("engine pool shut down");
    }
}

/// An engine checked out of an [`EnginePool`]
pub struct PooledEngine {
    client: Option<EngineClient>,
    pool: Arc<PoolInner>,
    permit: Option<OwnedSemaphorePermit>,
}

impl Deref for PooledEngine {
    type Target = EngineClient;

    fn deref(&self) -> &EngineClient {
        // Only taken in drop
        self.client.as_ref().expect("pooled engine already returned")
    }
}

impl Drop for PooledEngine {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            if self.pool.slots.is_closed() {
                debug!("pool closed, discarding returned engine");
            } else {
                self.pool.idle.lock().push(client);
            }
        }
        // Release the slot only once the engine is back
        drop(self.permit.take());
    }
}
