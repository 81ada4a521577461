//! Serialized dispatch worker
//!
//! Events are queued to a single task that handles them one at a time.
//! Dispatch holds the router's read lock and registration takes the write
//! lock, so the indices never change mid-dispatch.

use hubitat_core::Event;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{RouterError, RouterResult};
use crate::router::EventRouter;

/// Router shared between the dispatch worker and registration callers
pub type SharedRouter = Arc<RwLock<EventRouter>>;

/// Counters reported when the worker stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Events taken off the queue
    pub events: u64,
    /// Successful callbacks
    pub notified: u64,
    /// Failed callbacks
    pub failures: u64,
}

/// Spawns the dispatch worker
pub struct Dispatcher;

impl Dispatcher {
    /// Start a worker draining a queue of the given capacity
    pub fn spawn(router: SharedRouter, capacity: usize) -> DispatcherHandle {
        let (tx, mut rx) = mpsc::channel::<Event>(capacity.max(1));

        let task = tokio::spawn(async move {
            info!("Starting event dispatcher");
            let mut stats = DispatchStats::default();

            while let Some(event) = rx.recv().await {
                stats.events += 1;
                let report = router.read().await.dispatch(&event);

                stats.notified += report.notified.len() as u64;
                stats.failures += report.failures.len() as u64;
                for failure in &report.failures {
                    error!(automation = %failure.automation, error = %failure.error, "Dispatch failure");
                }
                if report.aborted {
                    warn!(notified = report.notified.len(), "Dispatch cycle aborted");
                } else {
                    debug!(notified = report.notified.len(), "Event dispatched");
                }

                if report.dropped > 0 {
                    router.write().await.prune_dropped();
                }
            }

            info!(events = stats.events, "Event dispatcher stopped");
            stats
        });

        DispatcherHandle { tx, task }
    }
}

/// Handle to a running dispatch worker
pub struct DispatcherHandle {
    tx: mpsc::Sender<Event>,
    task: JoinHandle<DispatchStats>,
}

impl DispatcherHandle {
    /// Queue an event, waiting for room if the queue is full
    pub async fn send(&self, event: Event) -> RouterResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| RouterError::DispatcherStopped)
    }

    /// Stop accepting events, drain the queue, and wait for the worker
    pub async fn shutdown(self) -> DispatchStats {
        drop(self.tx);
        match self.task.await {
            Ok(stats) => stats,
            Err(e) => {
                warn!(error = %e, "Dispatcher task did not finish cleanly");
                DispatchStats::default()
            }
        }
    }
}
