//! Background sweep that cancels queue entries older than the farm's timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::{CycleStore, FarmDirectory, QueueStore, ShelfRegistry};
use crate::util::clock;
use crate::util::serde::CycleId;

/// Periodic expiry pass over every farm of a directory.
pub struct ExpirySweeper<R, C, Q> {
    directory: Arc<FarmDirectory<R, C, Q>>,
    interval: Duration,
}

impl<R, C, Q> ExpirySweeper<R, C, Q>
where
    R: ShelfRegistry,
    C: CycleStore,
    Q: QueueStore,
{
    /// Sweep `directory` every `interval`.
    pub const fn new(directory: Arc<FarmDirectory<R, C, Q>>, interval: Duration) -> Self {
        Self {
            directory,
            interval,
        }
    }

    /// Run one pass at the current time. Returns the cycles cancelled.
    pub fn sweep_once(&self) -> Vec<CycleId> {
        let now = clock::now();
        let mut expired = Vec::new();
        for farm in self.directory.farms() {
            if farm.policy().entry_timeout().is_none() {
                continue;
            }
            match farm.prune_expired(now) {
                Ok(ids) => {
                    if !ids.is_empty() {
                        info!(farm_id = %farm.farm_id(), expired = ids.len(), "expired queue entries cancelled");
                    }
                    expired.extend(ids);
                }
                Err(err) => warn!(farm_id = %farm.farm_id(), error = %err, "expiry pass failed"),
            }
        }
        expired
    }

    /// Sweep until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis(), "starting expiry sweeper");
        let mut interval = tokio::time::interval(self.interval);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let expired = self.sweep_once();
                    debug!(expired = expired.len(), "expiry pass complete");
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("expiry sweeper shutting down");
                        break;
                    }
                }
            }
        }
    }
}

/// Spawn an [`ExpirySweeper`] on the current tokio runtime.
pub fn spawn_expiry_sweeper<R, C, Q>(
    directory: Arc<FarmDirectory<R, C, Q>>,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    R: ShelfRegistry + Send + 'static,
    C: CycleStore + Send + 'static,
    Q: QueueStore + Send + 'static,
{
    tokio::spawn(ExpirySweeper::new(directory, interval).run(shutdown))
}
