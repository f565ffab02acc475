//! Errors that abort a crawl cycle.

use inspector_source::{ColonyId, SourceError};
use inspector_store::StoreError;
use thiserror::Error;

pub type CrawlResult<T> = Result<T, CrawlError>;

/// Any of these aborts the current cycle only; the scheduler retries on the
/// next tick.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// A registry-wide counter could not be read.
    #[error("colony source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    /// A colony in `1..=N` failed to answer; no partial totals are published.
    #[error("enumeration failed at colony {id}: {source}")]
    PartialEnumeration {
        id: ColonyId,
        #[source]
        source: SourceError,
    },

    /// The snapshot marker could not be read or parsed.
    #[error("snapshot marker unreadable: {0}")]
    MarkerUnreadable(#[source] StoreError),

    #[error("store write failed: {0}")]
    StoreWrite(#[source] StoreError),

    /// A running sum exceeded `u64`.
    #[error("counter overflow while summing {0}")]
    Overflow(&'static str),

    /// A fan-out worker panicked or was cancelled.
    #[error("aggregation worker failed: {0}")]
    Worker(String),
}
