//! Storage and aggregation engine for ROTI ("Return On Time Invested") polls.
//!
//! A facilitator creates a short-lived poll, anonymous participants rate it
//! from 1 to 5 with optional feedback, and the engine reports aggregates.
//!
//! Components, leaves first:
//! - [`sqlite::Database`]: the shared connection pool and table lifecycle.
//! - [`allocator::IdAllocator`]: collision-free five-digit poll ids.
//! - [`sqlite::SqlitePollRepository`]: polls; sweeps and allocates on create.
//! - [`sqlite::SqliteVoteRepository`]: votes and their aggregates.
//! - [`validator::validate_vote`]: raw rating validation.
//! - [`sqlite::RetentionSweeper`]: purges polls past the retention window.
//!
//! [`RotiService`] bundles them behind the contract used by presentation
//! layers, and [`metrics`] samples poll gauges in the background.

pub mod allocator;
pub mod error;
pub mod metrics;
pub mod service;
pub mod sqlite;
pub mod traits;
pub mod types;
pub mod validator;

pub use allocator::{Claim, IdAllocator, IdSource, RandomIdSource, MAX_ALLOCATION_ATTEMPTS};
pub use error::{Result, RotiError};
pub use metrics::{spawn_gauge_sampler, PollGauges};
pub use service::{RotiService, SqliteRotiService};
pub use sqlite::{Database, RetentionSweeper, SweepReport};
pub use traits::{PollRepository, VoteRepository};
pub use types::{NewPoll, Poll, PollId, PollStats, PollSummary};
pub use validator::{validate_vote, Rating};
