//! Worker leases and liveness.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::{DomainKey, WorkerId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRecord {
    /// Sticky lease. Never overlaps another worker's set.
    pub assigned_domains: BTreeSet<DomainKey>,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    workers: HashMap<WorkerId, WorkerRecord>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, worker_id: &str) -> Option<&WorkerRecord> {
        self.workers.get(worker_id)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Refreshes `last_seen` for a registered worker. Returns `false` (and
    /// does nothing) for unknown workers.
    pub fn touch(&mut self, worker_id: &str, now: DateTime<Utc>) -> bool {
        match self.workers.get_mut(worker_id) {
            Some(record) => {
                record.last_seen = now;
                true
            }
            None => false,
        }
    }

    /// Drops every worker silent for longer than `timeout`, returning what was
    /// removed. Their domains become free as soon as the records are gone.
    pub fn cleanup_stale(
        &mut self,
        now: DateTime<Utc>,
        timeout: TimeDelta,
    ) -> Vec<(WorkerId, WorkerRecord)> {
        let stale: Vec<WorkerId> = self
            .workers
            .iter()
            .filter(|(_, record)| now - record.last_seen > timeout)
            .map(|(id, _)| id.clone())
            .collect();

        let mut removed: Vec<(WorkerId, WorkerRecord)> = stale
            .into_iter()
            .filter_map(|id| self.workers.remove_entry(&id))
            .collect();
        removed.sort_by(|a, b| a.0.cmp(&b.0));
        removed
    }

    pub fn release(&mut self, worker_id: &str) -> Option<WorkerRecord> {
        self.workers.remove(worker_id)
    }

    /// Domains leased to anyone other than `worker_id`.
    pub fn domains_held_by_others(&self, worker_id: &str) -> HashSet<&DomainKey> {
        self.workers
            .iter()
            .filter(|(id, _)| id.as_str() != worker_id)
            .flat_map(|(_, record)| record.assigned_domains.iter())
            .collect()
    }

    pub fn owner_of(&self, domain: &str) -> Option<&WorkerId> {
        self.workers
            .iter()
            .find(|(_, record)| record.assigned_domains.contains(domain))
            .map(|(id, _)| id)
    }

    /// Stores the worker's new lease, registering it if needed.
    pub fn commit(
        &mut self,
        worker_id: WorkerId,
        assigned_domains: BTreeSet<DomainKey>,
        now: DateTime<Utc>,
    ) {
        debug_assert!(
            assigned_domains.iter().all(|domain| self
                .owner_of(domain.as_str())
                .is_none_or(|owner| *owner == worker_id)),
            "domain leased to two workers"
        );
        self.workers.insert(
            worker_id,
            WorkerRecord {
                assigned_domains,
                last_seen: now,
            },
        );
    }

    pub fn assignments(&self) -> BTreeMap<WorkerId, Vec<DomainKey>> {
        self.workers
            .iter()
            .map(|(id, record)| {
                (id.clone(), record.assigned_domains.iter().cloned().collect())
            })
            .collect()
    }
}
