//! SnapshotGate — commits at most one time-series point per metric per day.
//!
//! The persisted snapshot marker records the day of the last commit. A cycle
//! whose date differs from the marker writes every metric's point for today
//! and only then advances the marker. The two writes are not atomic: a crash
//! in between leaves the marker on the previous day, and the retry rewrites
//! today's points with freshly derived totals.

use std::sync::Arc;

use inspector_store::records;
use inspector_store::{DateKey, Metric, SnapshotStore, Totals};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CrawlError, CrawlResult};

/// What to do when today is earlier than the persisted marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackPolicy {
    /// Any date other than the marker commits, including earlier ones.
    #[default]
    Commit,
    /// Skip until the clock catches up with the marker.
    Hold,
}

/// Outcome of [`SnapshotGate::maybe_commit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub committed: bool,
    /// The day the gate evaluated.
    pub date: DateKey,
    /// Marker value read before the decision, `None` on first run.
    pub previous: Option<DateKey>,
}

pub struct SnapshotGate {
    store: Arc<dyn SnapshotStore>,
    rollback: RollbackPolicy,
}

impl SnapshotGate {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            store,
            rollback: RollbackPolicy::default(),
        }
    }

    pub fn with_rollback_policy(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }

    /// Write today's points and advance the marker unless today is already
    /// committed.
    pub fn maybe_commit(&self, totals: &Totals, today: DateKey) -> CrawlResult<CommitResult> {
        let store = self.store.as_ref();
        let previous =
            records::read_snapshot_date(store).map_err(CrawlError::MarkerUnreadable)?;
        let skip = CommitResult {
            committed: false,
            date: today,
            previous,
        };

        match previous {
            Some(last) if last == today => {
                debug!(%today, "snapshot already committed today");
                return Ok(skip);
            }
            Some(last) if today < last => {
                warn!(%today, %last, policy = ?self.rollback, "clock is behind the snapshot marker");
                if self.rollback == RollbackPolicy::Hold {
                    return Ok(skip);
                }
            }
            Some(last) => debug!(%today, %last, "new day, committing snapshot"),
            None => info!(%today, "no snapshot marker yet, committing first snapshot"),
        }

        for metric in Metric::ALL {
            records::write_time_series_point(store, metric, today, totals.get(metric))
                .map_err(CrawlError::StoreWrite)?;
        }
        records::write_snapshot_date(store, today).map_err(CrawlError::StoreWrite)?;

        info!(
            %today,
            colonies = totals.colony_count,
            domains = totals.domain_count,
            tasks = totals.task_count,
            skills = totals.skill_count,
            "time-series snapshot committed"
        );

        Ok(CommitResult {
            committed: true,
            date: today,
            previous,
        })
    }
}
