//! Sticky, exclusive domain assignment.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use super::config::CoordinatorConfig;
use super::domains::DomainTable;
use super::workers::WorkerRegistry;
use crate::types::{DomainBacklog, DomainKey};

#[derive(Debug, Clone)]
pub struct AssignmentEngine {
    min_domains: usize,
    max_domains: usize,
}

impl AssignmentEngine {
    pub fn new(min_domains: usize, max_domains: usize) -> Self {
        Self {
            min_domains,
            max_domains,
        }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(config.min_domains_per_worker, config.max_domains_per_worker)
    }

    /// Computes the lease `worker_id` should hold next. Read-only: the caller
    /// commits the result.
    ///
    /// Kept domains must still have backlog, must not be held by another
    /// worker and must not be paused. A kept domain that is only cooling
    /// down stays leased so the worker keeps its domain between batches.
    /// When fewer than the minimum remain, fully available unleased domains
    /// are added in backlog order (largest first, then by key) up to the
    /// maximum.
    pub fn assign(
        &self,
        worker_id: &str,
        backlog: &[DomainBacklog],
        workers: &WorkerRegistry,
        domains: &DomainTable,
        now: DateTime<Utc>,
    ) -> BTreeSet<DomainKey> {
        let with_backlog: HashSet<&str> =
            backlog.iter().map(|entry| entry.domain.as_str()).collect();
        let taken = workers.domains_held_by_others(worker_id);

        let mut lease: BTreeSet<DomainKey> = workers
            .get(worker_id)
            .map(|record| {
                record
                    .assigned_domains
                    .iter()
                    .filter(|domain| with_backlog.contains(domain.as_str()))
                    .filter(|domain| !taken.contains(domain))
                    .filter(|domain| !domains.peek_paused(domain.as_str(), now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if lease.len() >= self.min_domains {
            return lease;
        }

        let mut candidates: Vec<&DomainBacklog> = backlog
            .iter()
            .filter(|entry| !lease.contains(&entry.domain))
            .filter(|entry| !taken.contains(&entry.domain))
            .filter(|entry| domains.peek_available(entry.domain.as_str(), now))
            .collect();
        candidates.sort_by(|a, b| {
            b.pending
                .cmp(&a.pending)
                .then_with(|| a.domain.cmp(&b.domain))
        });

        for entry in candidates {
            if lease.len() >= self.max_domains {
                break;
            }
            if lease.insert(entry.domain.clone()) {
                debug!(
                    worker_id,
                    domain = %entry.domain,
                    pending = entry.pending,
                    "domain acquired"
                );
            }
        }

        lease
    }
}

impl Default for AssignmentEngine {
    fn default() -> Self {
        Self::from_config(&CoordinatorConfig::default())
    }
}
