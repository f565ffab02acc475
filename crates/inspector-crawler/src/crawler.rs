//! Crawler — one full cycle: aggregate, persist totals, maybe snapshot.

use std::sync::Arc;
use std::time::{Duration, Instant};

use inspector_source::ColonySource;
use inspector_store::records;
use inspector_store::{SnapshotStore, Totals};
use serde::Serialize;
use tracing::info;

use crate::aggregator::{Aggregator, DEFAULT_CALL_TIMEOUT, DEFAULT_CONCURRENCY};
use crate::clock::Clock;
use crate::error::{CrawlError, CrawlResult};
use crate::gate::{CommitResult, RollbackPolicy, SnapshotGate};

/// Tunables for a crawler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    pub concurrency: usize,
    pub call_timeout: Duration,
    pub rollback: RollbackPolicy,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            rollback: RollbackPolicy::default(),
        }
    }
}

/// Result of a successful cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub totals: Totals,
    pub commit: CommitResult,
}

/// Drives one cycle over injected collaborators.
pub struct Crawler {
    aggregator: Aggregator,
    gate: Arc<SnapshotGate>,
    store: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
}

impl Crawler {
    pub fn new(
        source: Arc<dyn ColonySource>,
        store: Arc<dyn SnapshotStore>,
        clock: Arc<dyn Clock>,
        options: CrawlOptions,
    ) -> Self {
        let aggregator = Aggregator::new(source)
            .with_concurrency(options.concurrency)
            .with_call_timeout(options.call_timeout);
        let gate = SnapshotGate::new(Arc::clone(&store)).with_rollback_policy(options.rollback);
        Self {
            gate: Arc::new(gate),
            aggregator,
            store,
            clock,
        }
    }

    /// Run one cycle.
    ///
    /// Totals are persisted only after every colony answered; the snapshot
    /// gate only runs after the totals were persisted. Store writes commit
    /// synchronously, so they run on the blocking pool.
    pub async fn run_once(&self) -> CrawlResult<CycleReport> {
        let started = Instant::now();

        let totals = self.aggregator.run_cycle().await?;

        let store = Arc::clone(&self.store);
        let gate = Arc::clone(&self.gate);
        let clock = Arc::clone(&self.clock);
        let commit = tokio::task::spawn_blocking(move || {
            records::write_statistics(store.as_ref(), &totals).map_err(CrawlError::StoreWrite)?;
            gate.maybe_commit(&totals, clock.today())
        })
        .await
        .map_err(|e| CrawlError::Worker(e.to_string()))??;

        info!(
            colonies = totals.colony_count,
            domains = totals.domain_count,
            tasks = totals.task_count,
            skills = totals.skill_count,
            committed = commit.committed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "crawl cycle complete"
        );

        Ok(CycleReport { totals, commit })
    }
}
