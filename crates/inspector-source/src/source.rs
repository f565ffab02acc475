//! The colony registry as the crawler sees it.

use async_trait::async_trait;

use crate::error::SourceResult;

/// Colony ids are dense: `1..=colony_count()`.
pub type ColonyId = u64;

/// Enumerates colonies and exposes the registry-wide counters.
#[async_trait]
pub trait ColonySource: Send + Sync {
    /// Number of registered colonies.
    async fn colony_count(&self) -> SourceResult<u64>;

    /// Number of skills registered network-wide.
    async fn skill_count(&self) -> SourceResult<u64>;

    /// Handle to one colony. Fails with `NotFound` if `id` is out of range.
    async fn colony(&self, id: ColonyId) -> SourceResult<Box<dyn ColonyHandle>>;
}

/// Per-colony counters.
#[async_trait]
pub trait ColonyHandle: Send + Sync {
    fn id(&self) -> ColonyId;

    async fn domain_count(&self) -> SourceResult<u64>;

    async fn task_count(&self) -> SourceResult<u64>;
}
