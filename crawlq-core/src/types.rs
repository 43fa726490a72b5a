use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

/// Crawl target grouping, typically a website hostname. Keys are
/// case-sensitive and compared verbatim.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct DomainKey(pub String);

impl DomainKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DomainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DomainKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DomainKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DomainKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Opaque worker identifier chosen by the calling process.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for WorkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WorkerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for WorkerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A candidate URL handed to a worker. Read from the backlog, never written
/// back by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkItem {
    pub id: String,
    pub url: String,
    #[serde(rename = "source")]
    pub domain: DomainKey,
    pub canonical_name: String,
}

/// Outstanding backlog for one domain.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DomainBacklog {
    pub domain: DomainKey,
    pub pending: i64,
}

/// Live backlog counts used by the stats endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, sqlx::FromRow)]
pub struct BacklogTotals {
    pub total_available: i64,
    pub domains_available: i64,
}
