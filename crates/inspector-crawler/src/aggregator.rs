//! Aggregator — one crawl over every colony in the registry.
//!
//! Per-colony fetches fan out over a bounded pool of tokio tasks. Each
//! worker walks its own stride of ids in ascending order and keeps its own
//! partial sums; partials are reduced once all workers have joined, so no
//! accumulator is shared between tasks.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use inspector_source::{ColonyId, ColonySource, SourceError, SourceResult};
use inspector_store::Totals;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::{CrawlError, CrawlResult};

/// Default number of concurrent per-colony workers.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Default bound on a single registry call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

/// Domain and task sums from one worker.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct PartialSums {
    domains: u64,
    tasks: u64,
}

impl PartialSums {
    fn add(&mut self, domains: u64, tasks: u64) -> CrawlResult<()> {
        self.domains = self
            .domains
            .checked_add(domains)
            .ok_or(CrawlError::Overflow("domain count"))?;
        self.tasks = self
            .tasks
            .checked_add(tasks)
            .ok_or(CrawlError::Overflow("task count"))?;
        Ok(())
    }

    fn merge(&mut self, other: PartialSums) -> CrawlResult<()> {
        self.add(other.domains, other.tasks)
    }
}

/// Sums per-colony counters into registry-wide totals.
pub struct Aggregator {
    source: Arc<dyn ColonySource>,
    concurrency: usize,
    call_timeout: Duration,
}

impl Aggregator {
    pub fn new(source: Arc<dyn ColonySource>) -> Self {
        Self {
            source,
            concurrency: DEFAULT_CONCURRENCY,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Cap on concurrent colony fetches. `1` is a sequential ascending walk.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Bound on each registry call; exceeding it counts as unavailable.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Crawl every colony and return the totals.
    ///
    /// Fails without partial results if any counter cannot be read.
    pub async fn run_cycle(&self) -> CrawlResult<Totals> {
        let colony_count = timed(self.call_timeout, self.source.colony_count())
            .await
            .map_err(CrawlError::SourceUnavailable)?;
        let skill_count = timed(self.call_timeout, self.source.skill_count())
            .await
            .map_err(CrawlError::SourceUnavailable)?;

        let sums = self.sum_colonies(colony_count).await?;

        debug!(
            colonies = colony_count,
            skills = skill_count,
            domains = sums.domains,
            tasks = sums.tasks,
            "aggregation complete"
        );

        Ok(Totals {
            colony_count,
            skill_count,
            domain_count: sums.domains,
            task_count: sums.tasks,
        })
    }

    async fn sum_colonies(&self, colony_count: u64) -> CrawlResult<PartialSums> {
        let workers = usize::try_from(colony_count)
            .unwrap_or(usize::MAX)
            .min(self.concurrency);
        let stride = workers as u64;

        let mut set = JoinSet::new();
        for worker in 0..workers {
            let source = Arc::clone(&self.source);
            let call_timeout = self.call_timeout;
            set.spawn(async move {
                let mut partial = PartialSums::default();
                let mut id = worker as u64 + 1;
                while id <= colony_count {
                    let (domains, tasks) = fetch_colony(source.as_ref(), id, call_timeout)
                        .await
                        .map_err(|err| CrawlError::PartialEnumeration { id, source: err })?;
                    partial.add(domains, tasks)?;
                    id += stride;
                }
                Ok::<_, CrawlError>(partial)
            });
        }

        // Dropping the set on early return aborts the remaining workers.
        let mut sums = PartialSums::default();
        while let Some(joined) = set.join_next().await {
            let partial = joined.map_err(|e| CrawlError::Worker(e.to_string()))??;
            sums.merge(partial)?;
        }
        Ok(sums)
    }
}

async fn fetch_colony(
    source: &dyn ColonySource,
    id: ColonyId,
    call_timeout: Duration,
) -> SourceResult<(u64, u64)> {
    let colony = timed(call_timeout, source.colony(id)).await?;
    let domains = timed(call_timeout, colony.domain_count()).await?;
    let tasks = timed(call_timeout, colony.task_count()).await?;
    Ok((domains, tasks))
}

async fn timed<T>(
    limit: Duration,
    call: impl Future<Output = SourceResult<T>>,
) -> SourceResult<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Unavailable(format!(
            "call timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
