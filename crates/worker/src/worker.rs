//! Multi-worker driver
//!
//! A process hosts N independent workers, each a sequential loop over
//! the actor or decider iteration. Workers share no mutable state; the
//! supported shutdown mechanism is the quiesce file, checked before
//! each iteration. In-flight work always runs to completion.

use std::future::Future;
use std::path::Path;

use tokio::task::JoinHandle;
use tracing::{debug, info};

/// True when the quiesce path is configured and exists
pub fn quiesce_requested(path: Option<&Path>) -> bool {
    path.is_some_and(Path::exists)
}

/// A set of spawned worker loops
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` independent loops; `make` builds each worker's
    /// future from its index
    pub fn spawn<F, Fut>(workers: usize, make: F) -> Self
    where
        F: Fn(usize) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        info!(workers, "starting worker pool");
        let handles = (0..workers)
            .map(|index| {
                let worker = make(index);
                tokio::spawn(async move {
                    worker.await;
                    debug!(index, "worker stopped");
                })
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to stop
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
        info!("worker pool stopped");
    }
}
