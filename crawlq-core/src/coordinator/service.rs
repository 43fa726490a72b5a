//! The coordinator facade.
//!
//! Every operation runs inside one critical section guarded by a single
//! async mutex, so assignment, batch drawing, failure reporting and stats
//! never interleave. A request that fails on the backlog store commits
//! nothing: the lease and cooldowns are planned against the locked state and
//! written only after the store calls succeed.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use chrono::TimeDelta;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::assignment::AssignmentEngine;
use super::backlog::BacklogStore;
use super::batch::{Batch, BatchBuilder, BatchLimits};
use super::breaker::{CircuitBreaker, FailureOutcome};
use super::clock::{Clock, SystemClock};
use super::config::CoordinatorConfig;
use super::domains::{DomainState, DomainTable};
use super::workers::WorkerRegistry;
use crate::Result;
use crate::types::{BacklogTotals, DomainKey, WorkItem, WorkerId};

/// Validated request-work input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkRequest {
    pub worker_id: WorkerId,
    pub batch_size: usize,
    pub max_per_domain: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkBatch {
    pub items: Vec<WorkItem>,
    pub worker_domains: Vec<DomainKey>,
}

#[derive(Debug, Clone, Default)]
pub struct CoordinatorStats {
    pub totals: BacklogTotals,
    pub worker_assignments: BTreeMap<WorkerId, Vec<DomainKey>>,
    pub domain_cooldowns: BTreeMap<DomainKey, TimeDelta>,
    pub domain_pauses: BTreeMap<DomainKey, TimeDelta>,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    domains: DomainTable,
    workers: WorkerRegistry,
}

pub struct WorkQueueCoordinator {
    config: CoordinatorConfig,
    store: Arc<dyn BacklogStore>,
    clock: Arc<dyn Clock>,
    engine: AssignmentEngine,
    breaker: CircuitBreaker,
    batches: BatchBuilder,
    state: Mutex<CoordinatorState>,
}

impl fmt::Debug for WorkQueueCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("WorkQueueCoordinator");
        debug.field("config", &self.config).field("store", &self.store);

        match self.state.try_lock() {
            Ok(state) => {
                debug
                    .field("workers", &state.workers.len())
                    .field("domains", &state.domains.len());
            }
            Err(_) => {
                debug.field("state", &"<locked>");
            }
        }

        debug.finish()
    }
}

impl WorkQueueCoordinator {
    pub fn new(config: CoordinatorConfig, store: Arc<dyn BacklogStore>) -> Self {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: CoordinatorConfig,
        store: Arc<dyn BacklogStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine: AssignmentEngine::from_config(&config),
            breaker: CircuitBreaker::from_config(&config),
            batches: BatchBuilder::new(Arc::clone(&store)),
            config,
            store,
            clock,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Evicts stale workers, settles the caller's lease and draws a batch
    /// from the lease's domains that are not cooling down or paused. Nothing
    /// is committed unless every store call succeeds.
    pub async fn request_work(&self, request: WorkRequest) -> Result<WorkBatch> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let worker_id = request.worker_id;

        // Planned against a copy so a store failure leaves stale workers
        // registered.
        let mut planned = state.workers.clone();
        let evicted = planned.cleanup_stale(now, self.config.worker_timeout());

        let backlog = self.store.domains_with_backlog().await.inspect_err(|e| {
            error!(%worker_id, error = %e, "backlog domain listing failed");
        })?;

        let lease = self.engine.assign(
            worker_id.as_str(),
            &backlog,
            &planned,
            &state.domains,
            now,
        );
        let drawable: Vec<DomainKey> = lease
            .iter()
            .filter(|domain| state.domains.peek_available(domain.as_str(), now))
            .cloned()
            .collect();

        let limits = BatchLimits {
            batch_size: request.batch_size,
            max_per_domain: request.max_per_domain,
        };
        let batch = if drawable.is_empty() {
            Batch::empty()
        } else {
            self.batches
                .build(&drawable, limits)
                .await
                .inspect_err(|e| {
                    error!(
                        %worker_id,
                        domains = ?drawable,
                        error = %e,
                        "batch build failed"
                    );
                })?
        };

        for (stale, record) in evicted {
            warn!(
                worker_id = %stale,
                last_seen = %record.last_seen,
                released = ?record.assigned_domains,
                "stale worker evicted"
            );
        }

        let CoordinatorState { domains, workers } = &mut *state;
        *workers = planned;
        for domain in &lease {
            self.breaker.is_available(domains, domain, now);
        }
        for domain in &batch.drawn_from {
            let until = self.breaker.on_batch_drawn(domains, domain, now);
            debug!(%domain, cooldown_until = %until, "domain cooling down");
        }
        workers.commit(worker_id.clone(), lease.clone(), now);

        info!(
            %worker_id,
            domains = ?lease,
            items = batch.items.len(),
            "work assigned"
        );

        Ok(WorkBatch {
            items: batch.items,
            worker_domains: lease.into_iter().collect(),
        })
    }

    /// Refreshes a registered worker. Returns `false` for unknown workers,
    /// which are otherwise ignored.
    pub async fn heartbeat(&self, worker_id: &WorkerId) -> bool {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        let known = state.workers.touch(worker_id.as_str(), now);
        if !known {
            debug!(%worker_id, "heartbeat from unregistered worker ignored");
        }
        known
    }

    /// Records a failure against `domain`. Reports from unknown workers are
    /// ignored and return `None`.
    pub async fn report_failure(
        &self,
        worker_id: &WorkerId,
        domain: &DomainKey,
    ) -> Option<FailureOutcome> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        if !state.workers.touch(worker_id.as_str(), now) {
            debug!(%worker_id, %domain, "failure report from unregistered worker ignored");
            return None;
        }

        let outcome = self.breaker.on_failure(&mut state.domains, domain, now);
        match outcome {
            FailureOutcome::CoolingDown {
                failure_count,
                until,
            } => {
                info!(
                    %worker_id,
                    %domain,
                    failure_count,
                    cooldown_until = %until,
                    "domain failure reported; backing off"
                );
            }
            FailureOutcome::Paused {
                failure_count,
                until,
            } => {
                warn!(
                    %worker_id,
                    %domain,
                    failure_count,
                    paused_until = %until,
                    "domain paused after repeated failures"
                );
            }
        }
        Some(outcome)
    }

    /// Drops the worker's lease immediately. Returns `false` for unknown
    /// workers.
    pub async fn release(&self, worker_id: &WorkerId) -> bool {
        let mut state = self.state.lock().await;
        match state.workers.release(worker_id.as_str()) {
            Some(record) => {
                info!(
                    %worker_id,
                    released = ?record.assigned_domains,
                    "worker released its domains"
                );
                true
            }
            None => false,
        }
    }

    /// Circuit-breaker check for one domain. Clears expired cooldowns and
    /// pauses as a side effect.
    pub async fn is_domain_available(&self, domain: &DomainKey) -> bool {
        let mut state = self.state.lock().await;
        let now = self.clock.now();
        self.breaker.is_available(&mut state.domains, domain, now)
    }

    pub async fn domain_state(&self, domain: &str) -> Option<DomainState> {
        self.state.lock().await.domains.get(domain).cloned()
    }

    pub async fn worker_domains(&self, worker_id: &str) -> Option<BTreeSet<DomainKey>> {
        self.state
            .lock()
            .await
            .workers
            .get(worker_id)
            .map(|record| record.assigned_domains.clone())
    }

    /// Live backlog counts plus the in-memory maps. Performs no mutation.
    pub async fn stats(&self) -> Result<CoordinatorStats> {
        let state = self.state.lock().await;
        let now = self.clock.now();

        let totals = self.store.totals().await.inspect_err(|e| {
            error!(error = %e, "backlog totals query failed");
        })?;

        Ok(CoordinatorStats {
            totals,
            worker_assignments: state.workers.assignments(),
            domain_cooldowns: state.domains.cooldowns(now),
            domain_pauses: state.domains.pauses(now),
        })
    }
}
