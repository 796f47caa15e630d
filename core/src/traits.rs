//! Async repository traits for the poll engine.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so the
//! futures can be driven from spawned `tokio` tasks such as the gauge sampler.

use std::future::Future;

use crate::error::RotiError;
use crate::types::{NewPoll, Poll, PollId, PollSummary};
use crate::validator::Rating;

/// Repository for polls.
///
/// `create` runs the retention sweep before allocating an id, so retention
/// freshness follows creation traffic.
pub trait PollRepository: Send + Sync {
    fn create(
        &self,
        poll: &NewPoll,
        retention_days: u32,
    ) -> impl Future<Output = Result<PollId, RotiError>> + Send;
    fn get(&self, id: PollId) -> impl Future<Output = Result<Poll, RotiError>> + Send;
    fn list_recent(
        &self,
        limit: u32,
    ) -> impl Future<Output = Result<Vec<PollSummary>, RotiError>> + Send;
    fn count(&self) -> impl Future<Output = Result<i64, RotiError>> + Send;
    /// Highest internal sequence value, `0` when empty. Monotonic proxy for
    /// the number of polls ever created, not the next allocatable id.
    fn max_sequence(&self) -> impl Future<Output = Result<i64, RotiError>> + Send;
}

/// Repository for votes and their aggregates.
///
/// Aggregates are recomputed from storage on every call. `min_vote`,
/// `max_vote` and `average` return `0.0` for a poll without votes.
pub trait VoteRepository: Send + Sync {
    fn add_vote(
        &self,
        poll_id: PollId,
        rating: Rating,
        feedback: &str,
    ) -> impl Future<Output = Result<(), RotiError>> + Send;
    fn count_votes(&self, poll_id: PollId) -> impl Future<Output = Result<i64, RotiError>> + Send;
    fn min_vote(&self, poll_id: PollId) -> impl Future<Output = Result<f64, RotiError>> + Send;
    fn max_vote(&self, poll_id: PollId) -> impl Future<Output = Result<f64, RotiError>> + Send;
    fn average(&self, poll_id: PollId) -> impl Future<Output = Result<f64, RotiError>> + Send;
    fn list_feedback(
        &self,
        poll_id: PollId,
    ) -> impl Future<Output = Result<Vec<String>, RotiError>> + Send;
}
