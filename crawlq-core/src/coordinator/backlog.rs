//! Read-only view over the crawl backlog.

use std::fmt;

use async_trait::async_trait;

use crate::Result;
use crate::types::{BacklogTotals, DomainBacklog, DomainKey, WorkItem};

/// Source of unclaimed, unprocessed work items. The coordinator never writes
/// to it; other pipeline stages mark items consumed.
#[async_trait]
pub trait BacklogStore: Send + Sync + fmt::Debug {
    /// Domains that still have backlog, largest first, ties by domain key.
    async fn domains_with_backlog(&self) -> Result<Vec<DomainBacklog>>;

    /// Up to `limit` unclaimed items from `domains`, interleaved so that
    /// every domain's oldest item comes before any domain's second item.
    /// Rows locked by a concurrent reader are skipped, not waited on.
    async fn claim_candidates(
        &self,
        domains: &[DomainKey],
        limit: usize,
    ) -> Result<Vec<WorkItem>>;

    /// Live totals; never cached.
    async fn totals(&self) -> Result<BacklogTotals>;
}
