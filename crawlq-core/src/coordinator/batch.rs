//! Draws a capped, per-domain-limited slice of backlog for a worker.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::backlog::BacklogStore;
use crate::Result;
use crate::types::{DomainKey, WorkItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub batch_size: usize,
    pub max_per_domain: usize,
}

impl BatchLimits {
    /// Candidates requested from the store; twice the batch size gives the
    /// per-domain cap room to skip without starving the batch.
    pub fn candidate_limit(&self) -> usize {
        self.batch_size.saturating_mul(2)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    pub items: Vec<WorkItem>,
    /// Domains that contributed at least one item.
    pub drawn_from: BTreeSet<DomainKey>,
}

impl Batch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Walks `candidates` in order, keeping at most `max_per_domain` items
    /// per domain and `batch_size` in total.
    pub fn select(candidates: Vec<WorkItem>, limits: BatchLimits) -> Self {
        let mut per_domain: HashMap<DomainKey, usize> = HashMap::new();
        let mut batch = Self::empty();

        for item in candidates {
            if batch.items.len() >= limits.batch_size {
                break;
            }
            let taken = per_domain.entry(item.domain.clone()).or_default();
            if *taken >= limits.max_per_domain {
                continue;
            }
            *taken += 1;
            batch.drawn_from.insert(item.domain.clone());
            batch.items.push(item);
        }

        batch
    }
}

#[derive(Debug, Clone)]
pub struct BatchBuilder {
    store: Arc<dyn BacklogStore>,
}

impl BatchBuilder {
    pub fn new(store: Arc<dyn BacklogStore>) -> Self {
        Self { store }
    }

    pub async fn build(
        &self,
        domains: &[DomainKey],
        limits: BatchLimits,
    ) -> Result<Batch> {
        if domains.is_empty() || limits.batch_size == 0 {
            return Ok(Batch::empty());
        }

        let candidates = self
            .store
            .claim_candidates(domains, limits.candidate_limit())
            .await?;
        let fetched = candidates.len();
        let batch = Batch::select(candidates, limits);

        debug!(
            domains = domains.len(),
            fetched,
            selected = batch.items.len(),
            "batch built"
        );
        Ok(batch)
    }
}
