//! Domain-aware work distribution.
//!
//! The pieces compose in one direction: [`service::WorkQueueCoordinator`]
//! owns a [`domains::DomainTable`] and a [`workers::WorkerRegistry`] behind a
//! single lock, asks the [`assignment::AssignmentEngine`] which domains a
//! worker should hold, filters them through the [`breaker::CircuitBreaker`],
//! and draws items with the [`batch::BatchBuilder`] from a
//! [`backlog::BacklogStore`].

pub mod assignment;
pub mod backlog;
pub mod batch;
pub mod breaker;
pub mod clock;
pub mod config;
pub mod domains;
pub mod memory;
pub mod persistence;
pub mod service;
pub mod workers;

pub use assignment::AssignmentEngine;
pub use backlog::BacklogStore;
pub use batch::{Batch, BatchBuilder, BatchLimits};
pub use breaker::{CircuitBreaker, FailureOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CoordinatorConfig;
pub use domains::{DomainPhase, DomainState, DomainTable};
pub use memory::InMemoryBacklogStore;
pub use persistence::PostgresBacklogStore;
pub use service::{CoordinatorStats, WorkBatch, WorkQueueCoordinator, WorkRequest};
pub use workers::{WorkerRecord, WorkerRegistry};
