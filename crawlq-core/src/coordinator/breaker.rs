//! Per-domain rate limiting and circuit breaking.
//!
//! `AVAILABLE -> (batch drawn) -> COOLING_DOWN -> (expiry) -> AVAILABLE`
//! `AVAILABLE -> (failure below threshold) -> COOLING_DOWN (backoff)`
//! `* -> (failure at threshold) -> PAUSED -> (expiry) -> AVAILABLE`
//!
//! Recovery only happens through expiry; a successful batch never lowers the
//! failure count.

use chrono::{DateTime, TimeDelta, Utc};

use super::clock::advance_by;
use super::config::CoordinatorConfig;
use super::domains::{DomainState, DomainTable};
use crate::types::DomainKey;

/// Cap on the backoff exponent so very large thresholds cannot overflow.
const MAX_BACKOFF_EXPONENT: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    CoolingDown {
        failure_count: u32,
        until: DateTime<Utc>,
    },
    Paused {
        failure_count: u32,
        until: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    base_cooldown: TimeDelta,
    failure_threshold: u32,
    pause_duration: TimeDelta,
}

impl CircuitBreaker {
    pub fn new(
        base_cooldown: TimeDelta,
        failure_threshold: u32,
        pause_duration: TimeDelta,
    ) -> Self {
        Self {
            base_cooldown,
            failure_threshold: failure_threshold.max(1),
            pause_duration,
        }
    }

    pub fn from_config(config: &CoordinatorConfig) -> Self {
        Self::new(
            config.domain_cooldown(),
            config.max_consecutive_failures,
            config.pause_duration(),
        )
    }

    /// Availability check that also clears expired timers. An expired pause
    /// resets the failure count, so callers must treat this as a write.
    pub fn is_available(
        &self,
        table: &mut DomainTable,
        domain: &DomainKey,
        now: DateTime<Utc>,
    ) -> bool {
        let state = table.entry(domain);
        clear_expired(state, now);
        state.paused_until.is_none() && state.cooldown_until.is_none()
    }

    /// Politeness delay after a batch was drawn from `domain`.
    pub fn on_batch_drawn(
        &self,
        table: &mut DomainTable,
        domain: &DomainKey,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let until = advance_by(now, self.base_cooldown);
        table.entry(domain).cooldown_until = Some(until);
        until
    }

    pub fn on_failure(
        &self,
        table: &mut DomainTable,
        domain: &DomainKey,
        now: DateTime<Utc>,
    ) -> FailureOutcome {
        let state = table.entry(domain);
        clear_expired(state, now);
        state.failure_count = state.failure_count.saturating_add(1);
        let failure_count = state.failure_count;

        if failure_count >= self.failure_threshold {
            let until = advance_by(now, self.pause_duration);
            state.paused_until = Some(until);
            FailureOutcome::Paused {
                failure_count,
                until,
            }
        } else {
            let until = advance_by(now, self.backoff(failure_count));
            state.cooldown_until = Some(until);
            FailureOutcome::CoolingDown {
                failure_count,
                until,
            }
        }
    }

    /// `base * 2^(failures - 1)`
    pub fn backoff(&self, failure_count: u32) -> TimeDelta {
        let exponent = failure_count.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
        self.base_cooldown
            .checked_mul(1i32 << exponent)
            .unwrap_or(TimeDelta::MAX)
    }
}

/// Drops timers that ran out by `now`. An expired pause also resets the
/// failure count.
fn clear_expired(state: &mut DomainState, now: DateTime<Utc>) {
    if state.paused_until.is_some_and(|until| until <= now) {
        state.paused_until = None;
        state.failure_count = 0;
    }
    if state.cooldown_until.is_some_and(|until| until <= now) {
        state.cooldown_until = None;
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::from_config(&CoordinatorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::domains::DomainPhase;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn domain() -> DomainKey {
        DomainKey::from("news.example.com")
    }

    #[test]
    fn failures_back_off_exponentially_then_pause() {
        let breaker = CircuitBreaker::default();
        let mut table = DomainTable::new();

        assert_eq!(
            breaker.on_failure(&mut table, &domain(), at(0)),
            FailureOutcome::CoolingDown {
                failure_count: 1,
                until: at(60),
            }
        );
        assert_eq!(
            breaker.on_failure(&mut table, &domain(), at(0)),
            FailureOutcome::CoolingDown {
                failure_count: 2,
                until: at(120),
            }
        );
        assert_eq!(
            breaker.on_failure(&mut table, &domain(), at(0)),
            FailureOutcome::Paused {
                failure_count: 3,
                until: at(1800),
            }
        );
        assert!(!breaker.is_available(&mut table, &domain(), at(1799)));
    }

    #[test]
    fn expired_pause_resets_failure_count() {
        let breaker = CircuitBreaker::default();
        let mut table = DomainTable::new();
        for _ in 0..3 {
            breaker.on_failure(&mut table, &domain(), at(0));
        }

        assert!(breaker.is_available(&mut table, &domain(), at(1800)));
        let state = table.get("news.example.com").unwrap();
        assert_eq!(state.failure_count, 0);
        assert_eq!(state.paused_until, None);
        assert_eq!(state.cooldown_until, None);
    }

    #[test]
    fn failure_after_expired_pause_starts_a_new_streak() {
        let breaker = CircuitBreaker::default();
        let mut table = DomainTable::new();
        for _ in 0..3 {
            breaker.on_failure(&mut table, &domain(), at(0));
        }

        assert_eq!(
            breaker.on_failure(&mut table, &domain(), at(1801)),
            FailureOutcome::CoolingDown {
                failure_count: 1,
                until: at(1861),
            }
        );
        let state = table.get("news.example.com").unwrap();
        assert_eq!(state.paused_until, None);
        assert_eq!(state.failure_count, 1);
    }

    #[test]
    fn failure_during_pause_extends_it() {
        let breaker = CircuitBreaker::default();
        let mut table = DomainTable::new();
        for _ in 0..3 {
            breaker.on_failure(&mut table, &domain(), at(0));
        }

        assert_eq!(
            breaker.on_failure(&mut table, &domain(), at(100)),
            FailureOutcome::Paused {
                failure_count: 4,
                until: at(1900),
            }
        );
    }

    #[test]
    fn success_does_not_reduce_failures() {
        let breaker = CircuitBreaker::default();
        let mut table = DomainTable::new();
        breaker.on_failure(&mut table, &domain(), at(0));
        breaker.on_batch_drawn(&mut table, &domain(), at(200));

        let state = table.get("news.example.com").unwrap();
        assert_eq!(state.failure_count, 1);
        assert_eq!(state.phase(at(200)), DomainPhase::CoolingDown {
            until: at(260)
        });
    }

    #[test]
    fn check_creates_entry_lazily() {
        let breaker = CircuitBreaker::default();
        let mut table = DomainTable::new();
        assert!(breaker.is_available(&mut table, &domain(), at(0)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn backoff_is_capped() {
        let breaker =
            CircuitBreaker::new(TimeDelta::seconds(1), 100, TimeDelta::zero());
        assert_eq!(breaker.backoff(1), TimeDelta::seconds(1));
        assert_eq!(breaker.backoff(3), TimeDelta::seconds(4));
        assert_eq!(breaker.backoff(90), TimeDelta::seconds(1 << 16));
    }

    #[test]
    fn threshold_of_one_pauses_immediately() {
        let breaker =
            CircuitBreaker::new(TimeDelta::seconds(60), 1, TimeDelta::seconds(10));
        let mut table = DomainTable::new();
        assert!(matches!(
            breaker.on_failure(&mut table, &domain(), at(0)),
            FailureOutcome::Paused { failure_count: 1, .. }
        ));
    }
}
