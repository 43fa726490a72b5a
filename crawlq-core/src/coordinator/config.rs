//! Coordinator tuning knobs.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DOMAIN_COOLDOWN_SECS: u64 = 60;
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 3;
pub const DEFAULT_PAUSE_DURATION_SECS: u64 = 1800;
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_MIN_DOMAINS_PER_WORKER: usize = 1;
pub const DEFAULT_MAX_DOMAINS_PER_WORKER: usize = 1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Delay after a batch is drawn before the domain may be drawn again.
    /// Also the base of the failure backoff.
    pub domain_cooldown_secs: u64,
    /// Reported failures that trip the breaker into a pause.
    pub max_consecutive_failures: u32,
    pub pause_duration_secs: u64,
    /// Silence after which a worker's lease is revoked.
    pub worker_timeout_secs: u64,
    pub min_domains_per_worker: usize,
    pub max_domains_per_worker: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            domain_cooldown_secs: DEFAULT_DOMAIN_COOLDOWN_SECS,
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
            pause_duration_secs: DEFAULT_PAUSE_DURATION_SECS,
            worker_timeout_secs: DEFAULT_WORKER_TIMEOUT_SECS,
            min_domains_per_worker: DEFAULT_MIN_DOMAINS_PER_WORKER,
            max_domains_per_worker: DEFAULT_MAX_DOMAINS_PER_WORKER,
        }
    }
}

impl CoordinatorConfig {
    pub fn domain_cooldown(&self) -> TimeDelta {
        seconds(self.domain_cooldown_secs)
    }

    pub fn pause_duration(&self) -> TimeDelta {
        seconds(self.pause_duration_secs)
    }

    pub fn worker_timeout(&self) -> TimeDelta {
        seconds(self.worker_timeout_secs)
    }
}

fn seconds(secs: u64) -> TimeDelta {
    TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
        .unwrap_or(TimeDelta::MAX)
}
