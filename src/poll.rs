use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::fetch::{Endpoint, FetchError, Fetcher};
use crate::storage::SnapshotStore;

/// Per-target tally reported when a worker stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub target: String,
    pub cycles: u64,
    pub successes: u64,
    pub failures: u64,
}

/// Runs one independent fetch-write-sleep loop per tracked endpoint.
///
/// Workers are tokio tasks on the shared runtime. The fetcher caps how many requests are on the
/// wire at once; a worker sitting out a backoff holds no slot. The shutdown token is honoured at
/// every suspension point.
#[derive(Clone)]
pub struct Poller {
    fetcher: Arc<Fetcher>,
    store: Arc<SnapshotStore>,
    interval: Duration,
}

impl Poller {
    pub fn new(fetcher: Arc<Fetcher>, store: Arc<SnapshotStore>, interval: Duration) -> Self {
        Self {
            fetcher,
            store,
            interval,
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// One poll iteration out of cycle: fetch `target` and persist the payload.
    pub async fn refresh_once(
        &self,
        target: &Endpoint,
        shutdown: &CancellationToken,
    ) -> Result<PathBuf> {
        let payload = match self.fetcher.fetch(target, shutdown).await {
            Ok(payload) => payload,
            Err(FetchError::Cancelled) => return Err(AppError::Cancelled),
            Err(err) => return Err(err.into()),
        };
        self.store.write(&target.snapshot_id(), &payload)
    }

    /// Poll every target until `shutdown` is cancelled, then report how each worker fared.
    pub async fn run(
        &self,
        targets: Vec<Endpoint>,
        shutdown: CancellationToken,
    ) -> Result<Vec<CycleStats>> {
        log::info!(
            "polling {} target(s) every {:?}",
            targets.len(),
            self.interval
        );

        let handles: Vec<_> = targets
            .into_iter()
            .map(|target| {
                let poller = self.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { poller.worker(target, shutdown).await })
            })
            .collect();

        let mut stats = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            stats.push(joined?);
        }
        Ok(stats)
    }

    async fn worker(self, target: Endpoint, shutdown: CancellationToken) -> CycleStats {
        let mut stats = CycleStats {
            target: target.snapshot_id(),
            ..CycleStats::default()
        };

        while !shutdown.is_cancelled() {
            match self.refresh_once(&target, &shutdown).await {
                Ok(_) => stats.successes += 1,
                Err(AppError::Cancelled) => break,
                Err(err) => {
                    stats.failures += 1;
                    log::warn!("{}: no data this cycle: {}", target, err);
                }
            }
            stats.cycles += 1;

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(self.interval) => {}
            }
        }

        log::debug!(
            "{} stopped after {} cycle(s)",
            stats.target,
            stats.cycles
        );
        stats
    }
}
