//! Per-domain politeness state.
//!
//! Entries are created lazily on first reference and never removed; the
//! table is bounded by the number of distinct domains ever observed.
//! Transitions live in [`super::breaker`]; this module only stores state and
//! answers read-only questions about it.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::DomainKey;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainState {
    pub cooldown_until: Option<DateTime<Utc>>,
    pub failure_count: u32,
    pub paused_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainPhase {
    Available,
    CoolingDown { until: DateTime<Utc> },
    Paused { until: DateTime<Utc> },
}

impl DomainState {
    /// Phase as observed at `now`, without clearing expired timers.
    /// A pause always wins over a cooldown.
    pub fn phase(&self, now: DateTime<Utc>) -> DomainPhase {
        if let Some(until) = self.paused_until.filter(|until| *until > now) {
            return DomainPhase::Paused { until };
        }
        if let Some(until) = self.cooldown_until.filter(|until| *until > now) {
            return DomainPhase::CoolingDown { until };
        }
        DomainPhase::Available
    }

    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.phase(now), DomainPhase::Available)
    }

    pub fn is_paused_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.phase(now), DomainPhase::Paused { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct DomainTable {
    domains: HashMap<DomainKey, DomainState>,
}

impl DomainTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, domain: &str) -> Option<&DomainState> {
        self.domains.get(domain)
    }

    /// Mutable access, creating the default entry on first reference.
    pub fn entry(&mut self, domain: &DomainKey) -> &mut DomainState {
        self.domains.entry(domain.clone()).or_default()
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Read-only availability. Unknown domains are available.
    pub fn peek_available(&self, domain: &str, now: DateTime<Utc>) -> bool {
        self.get(domain)
            .is_none_or(|state| state.is_available_at(now))
    }

    pub fn peek_paused(&self, domain: &str, now: DateTime<Utc>) -> bool {
        self.get(domain).is_some_and(|state| state.is_paused_at(now))
    }

    /// Remaining cooldown for every domain that is cooling down (and not
    /// paused) at `now`.
    pub fn cooldowns(&self, now: DateTime<Utc>) -> BTreeMap<DomainKey, TimeDelta> {
        self.remaining(now, |phase| match phase {
            DomainPhase::CoolingDown { until } => Some(until),
            _ => None,
        })
    }

    /// Remaining pause for every paused domain at `now`.
    pub fn pauses(&self, now: DateTime<Utc>) -> BTreeMap<DomainKey, TimeDelta> {
        self.remaining(now, |phase| match phase {
            DomainPhase::Paused { until } => Some(until),
            _ => None,
        })
    }

    fn remaining(
        &self,
        now: DateTime<Utc>,
        select: impl Fn(DomainPhase) -> Option<DateTime<Utc>>,
    ) -> BTreeMap<DomainKey, TimeDelta> {
        self.domains
            .iter()
            .filter_map(|(domain, state)| {
                select(state.phase(now))
                    .map(|until| (domain.clone(), until - now))
            })
            .collect()
    }
}
