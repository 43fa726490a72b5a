//! Wire types for the queue HTTP surface.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinator::{CoordinatorStats, WorkBatch, WorkRequest};
use crate::types::{DomainKey, WorkItem, WorkerId};

pub const BATCH_SIZE_RANGE: RangeInclusive<i64> = 1..=500;
pub const DEFAULT_BATCH_SIZE: i64 = 50;
pub const MAX_PER_DOMAIN_RANGE: RangeInclusive<i64> = 1..=20;
pub const DEFAULT_MAX_PER_DOMAIN: i64 = 3;

/// Request rejected before it reaches the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("worker_id must not be empty")]
    EmptyWorkerId,
    #[error("domain must not be empty")]
    EmptyDomain,
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

fn default_batch_size() -> i64 {
    DEFAULT_BATCH_SIZE
}

fn default_max_per_domain() -> i64 {
    DEFAULT_MAX_PER_DOMAIN
}

fn check_range(
    field: &'static str,
    value: i64,
    range: &RangeInclusive<i64>,
) -> Result<usize, ValidationError> {
    if range.contains(&value) {
        usize::try_from(value).map_err(|_| ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

/// Worker ids are opaque: blank ids are rejected, anything else is kept
/// verbatim.
fn require_worker_id(raw: &str) -> Result<WorkerId, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::EmptyWorkerId);
    }
    Ok(WorkerId::new(raw))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestWorkRequest {
    pub worker_id: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
    #[serde(default = "default_max_per_domain")]
    pub max_articles_per_domain: i64,
}

impl RequestWorkRequest {
    pub fn new(worker_id: impl Into<String>) -> Self {
        Self {
            worker_id: worker_id.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            max_articles_per_domain: DEFAULT_MAX_PER_DOMAIN,
        }
    }

    pub fn validate(&self) -> Result<WorkRequest, ValidationError> {
        let worker_id = require_worker_id(&self.worker_id)?;
        let batch_size =
            check_range("batch_size", self.batch_size, &BATCH_SIZE_RANGE)?;
        let max_per_domain = check_range(
            "max_articles_per_domain",
            self.max_articles_per_domain,
            &MAX_PER_DOMAIN_RANGE,
        )?;

        Ok(WorkRequest {
            worker_id,
            batch_size,
            max_per_domain,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestWorkResponse {
    pub items: Vec<WorkItem>,
    pub worker_domains: Vec<String>,
}

impl From<WorkBatch> for RequestWorkResponse {
    fn from(batch: WorkBatch) -> Self {
        Self {
            items: batch.items,
            worker_domains: batch
                .worker_domains
                .into_iter()
                .map(|domain| domain.0)
                .collect(),
        }
    }
}

/// Body shared by heartbeat and release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub worker_id: String,
}

impl WorkerRequest {
    pub fn validate(&self) -> Result<WorkerId, ValidationError> {
        require_worker_id(&self.worker_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportFailureRequest {
    pub worker_id: String,
    pub domain: String,
}

impl ReportFailureRequest {
    pub fn validate(&self) -> Result<(WorkerId, DomainKey), ValidationError> {
        let worker_id = require_worker_id(&self.worker_id)?;
        if self.domain.is_empty() {
            return Err(ValidationError::EmptyDomain);
        }
        Ok((worker_id, DomainKey::new(self.domain.clone())))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub total_available: i64,
    pub domains_available: i64,
    pub domains_paused: usize,
    pub active_workers: usize,
    pub worker_assignments: BTreeMap<String, Vec<String>>,
    pub domain_cooldowns: BTreeMap<String, f64>,
    pub domain_pauses: BTreeMap<String, f64>,
}

impl From<CoordinatorStats> for StatsResponse {
    fn from(stats: CoordinatorStats) -> Self {
        Self {
            total_available: stats.totals.total_available,
            domains_available: stats.totals.domains_available,
            domains_paused: stats.domain_pauses.len(),
            active_workers: stats.worker_assignments.len(),
            worker_assignments: stats
                .worker_assignments
                .into_iter()
                .map(|(worker, domains)| {
                    (
                        worker.0,
                        domains.into_iter().map(|domain| domain.0).collect(),
                    )
                })
                .collect(),
            domain_cooldowns: seconds_remaining(stats.domain_cooldowns),
            domain_pauses: seconds_remaining(stats.domain_pauses),
        }
    }
}

fn seconds_remaining(
    remaining: BTreeMap<DomainKey, chrono::TimeDelta>,
) -> BTreeMap<String, f64> {
    remaining
        .into_iter()
        .map(|(domain, left)| {
            (domain.0, left.num_milliseconds() as f64 / 1000.0)
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
