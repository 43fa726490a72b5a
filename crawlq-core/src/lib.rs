//! Core library for crawlq, the work-distribution coordinator of the
//! local-news crawling pipeline.
//!
//! The coordinator hands outstanding backlog items to a changing set of
//! crawler workers. Each worker leases a small set of domains; a domain is
//! never leased to two workers at once, every drawn batch puts the domain
//! into a politeness cooldown, and repeated failures trip a per-domain
//! circuit breaker.
//!
//! The [`coordinator::WorkQueueCoordinator`] facade is the only entry point
//! transports should use. Backlog access goes through the
//! [`coordinator::BacklogStore`] trait, implemented for Postgres and for an
//! in-memory fixture.

pub mod api;
pub mod api_types;
pub mod coordinator;
pub mod error;
pub mod types;

pub use error::{CoordinatorError, Result};
pub use types::{BacklogTotals, DomainBacklog, DomainKey, WorkItem, WorkerId};

/// Backlog schema used by `db migrate` and the database-backed tests.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
