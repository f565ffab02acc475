//! inspector-crawler — periodic colony statistics crawler.
//!
//! Every tick enumerates all colonies, sums their counters into global
//! totals, persists the totals, and at most once per calendar day appends a
//! dated point to each metric's time series.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (fixed interval, skips overlapping ticks, stop hook)
//!   └── Crawler::run_once()
//!         ├── Aggregator::run_cycle()   ← ColonySource, bounded worker pool
//!         ├── records::write_statistics ← only on a complete aggregation
//!         └── SnapshotGate::maybe_commit(totals, today)
//!               ├── marker == today → no-op
//!               └── else: time-series points, then marker
//! ```
//!
//! The gate writes the series before the marker, so a crash between the two
//! leaves the marker stale and the next cycle rewrites the same day's points.

pub mod aggregator;
pub mod clock;
pub mod crawler;
pub mod error;
pub mod gate;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregator::Aggregator;
pub use clock::{Clock, SystemClock};
pub use crawler::{CrawlOptions, Crawler, CycleReport};
pub use error::{CrawlError, CrawlResult};
pub use gate::{CommitResult, RollbackPolicy, SnapshotGate};
pub use scheduler::{Scheduler, SchedulerHandle};
