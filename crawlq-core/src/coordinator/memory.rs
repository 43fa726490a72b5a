//! In-process backlog for tests and local runs without Postgres.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::backlog::BacklogStore;
use crate::types::{BacklogTotals, DomainBacklog, DomainKey, WorkItem};
use crate::{CoordinatorError, Result};

#[derive(Debug, Clone)]
struct Entry {
    item: WorkItem,
    pending: bool,
}

/// Mirrors the Postgres store's ordering and interleaving. Items stay
/// pending until [`InMemoryBacklogStore::mark_processed`] is called.
#[derive(Debug, Default)]
pub struct InMemoryBacklogStore {
    entries: Mutex<Vec<Entry>>,
    canonical_names: Mutex<HashMap<DomainKey, String>>,
    offline: AtomicBool,
}

impl InMemoryBacklogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register_source(
        &self,
        domain: impl Into<DomainKey>,
        canonical_name: impl Into<String>,
    ) {
        self.canonical_names
            .lock()
            .await
            .insert(domain.into(), canonical_name.into());
    }

    /// Appends a pending item and returns its id.
    pub async fn push(
        &self,
        id: impl Into<String>,
        url: impl Into<String>,
        domain: impl Into<DomainKey>,
    ) -> String {
        let id = id.into();
        let domain = domain.into();
        let canonical_name = self
            .canonical_names
            .lock()
            .await
            .get(&domain)
            .cloned()
            .unwrap_or_else(|| domain.0.clone());

        self.entries.lock().await.push(Entry {
            item: WorkItem {
                id: id.clone(),
                url: url.into(),
                domain,
                canonical_name,
            },
            pending: true,
        });
        id
    }

    /// Adds `count` generated items for `domain`.
    pub async fn seed(&self, domain: &str, count: usize) -> Vec<String> {
        let mut ids = Vec::with_capacity(count);
        for n in 0..count {
            let id = format!("{domain}-{n}");
            ids.push(
                self.push(id, format!("https://{domain}/story/{n}"), domain)
                    .await,
            );
        }
        ids
    }

    /// Marks an item consumed, as the extraction stage would.
    pub async fn mark_processed(&self, id: &str) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.iter_mut().find(|entry| entry.item.id == id) {
            Some(entry) => {
                let was_pending = entry.pending;
                entry.pending = false;
                was_pending
            }
            None => false,
        }
    }

    /// Simulates an unreachable database.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoordinatorError::Backlog(
                "in-memory backlog is offline".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BacklogStore for InMemoryBacklogStore {
    async fn domains_with_backlog(&self) -> Result<Vec<DomainBacklog>> {
        self.ensure_online()?;
        let entries = self.entries.lock().await;

        let mut counts: BTreeMap<&DomainKey, i64> = BTreeMap::new();
        for entry in entries.iter().filter(|entry| entry.pending) {
            *counts.entry(&entry.item.domain).or_default() += 1;
        }

        let mut backlog: Vec<DomainBacklog> = counts
            .into_iter()
            .map(|(domain, pending)| DomainBacklog {
                domain: domain.clone(),
                pending,
            })
            .collect();
        backlog.sort_by(|a, b| {
            b.pending
                .cmp(&a.pending)
                .then_with(|| a.domain.cmp(&b.domain))
        });
        Ok(backlog)
    }

    async fn claim_candidates(
        &self,
        domains: &[DomainKey],
        limit: usize,
    ) -> Result<Vec<WorkItem>> {
        self.ensure_online()?;
        let entries = self.entries.lock().await;

        let mut per_domain: BTreeMap<&DomainKey, Vec<&WorkItem>> = domains
            .iter()
            .map(|domain| (domain, Vec::new()))
            .collect();
        for entry in entries.iter().filter(|entry| entry.pending) {
            if let Some(bucket) = per_domain.get_mut(&entry.item.domain)
                && bucket.len() < limit
            {
                bucket.push(&entry.item);
            }
        }

        // Slot-major order: first item of every domain, then the second...
        let depth = per_domain.values().map(Vec::len).max().unwrap_or(0);
        let mut items = Vec::new();
        for slot in 0..depth {
            for bucket in per_domain.values() {
                if items.len() >= limit {
                    return Ok(items);
                }
                if let Some(item) = bucket.get(slot) {
                    items.push((*item).clone());
                }
            }
        }
        Ok(items)
    }

    async fn totals(&self) -> Result<BacklogTotals> {
        self.ensure_online()?;
        let entries = self.entries.lock().await;

        let pending: Vec<&DomainKey> = entries
            .iter()
            .filter(|entry| entry.pending)
            .map(|entry| &entry.item.domain)
            .collect();
        let mut distinct = pending.clone();
        distinct.sort();
        distinct.dedup();

        Ok(BacklogTotals {
            total_available: pending.len() as i64,
            domains_available: distinct.len() as i64,
        })
    }
}
