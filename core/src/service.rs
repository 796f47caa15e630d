//! Entry point consumed by presentation layers (HTTP handlers, CLI, exports).

use crate::error::RotiError;
use crate::sqlite::{Database, SqlitePollRepository, SqliteVoteRepository, MAX_RECENT_POLLS};
use crate::traits::{PollRepository, VoteRepository};
use crate::types::{NewPoll, Poll, PollId, PollStats, PollSummary};
use crate::validator::{validate_vote, Rating};

/// Poll engine facade over a poll repository and a vote repository.
///
/// Built once at startup and shared by reference; holds no global state.
pub struct RotiService<P, V> {
    polls: P,
    votes: V,
}

/// Service backed by the SQLite repositories.
pub type SqliteRotiService = RotiService<SqlitePollRepository, SqliteVoteRepository>;

impl SqliteRotiService {
    pub fn sqlite(db: &Database) -> Self {
        Self::new(
            SqlitePollRepository::new(db.pool().clone()),
            SqliteVoteRepository::new(db.pool().clone()),
        )
    }
}

impl<P: PollRepository, V: VoteRepository> RotiService<P, V> {
    pub fn new(polls: P, votes: V) -> Self {
        Self { polls, votes }
    }

    pub fn polls(&self) -> &P {
        &self.polls
    }

    pub fn votes(&self) -> &V {
        &self.votes
    }

    /// Sweep polls older than `retention_days`, then create a new one.
    ///
    /// Two concurrent creations can never share an id: the loser of the
    /// race sees a unique violation and draws again.
    pub async fn create_poll(&self, poll: &NewPoll, retention_days: u32) -> Result<PollId, RotiError> {
        self.polls.create(poll, retention_days).await
    }

    pub async fn get_poll(&self, id: PollId) -> Result<Poll, RotiError> {
        self.polls.get(id).await
    }

    /// Latest public polls, most recent first.
    pub async fn list_recent_polls(&self) -> Result<Vec<PollSummary>, RotiError> {
        self.polls.list_recent(MAX_RECENT_POLLS).await
    }

    pub fn validate_vote(&self, raw: &str) -> Result<Rating, RotiError> {
        validate_vote(raw)
    }

    /// Record a vote on an existing poll. Fails with `NotFound` when the
    /// poll does not exist (or was swept).
    pub async fn add_vote(&self, poll_id: PollId, rating: Rating, feedback: &str) -> Result<(), RotiError> {
        self.polls.get(poll_id).await?;
        self.votes.add_vote(poll_id, rating, feedback).await
    }

    pub async fn poll_stats(&self, poll_id: PollId) -> Result<PollStats, RotiError> {
        Ok(PollStats {
            count: self.votes.count_votes(poll_id).await?,
            min: self.votes.min_vote(poll_id).await?,
            max: self.votes.max_vote(poll_id).await?,
            average: self.votes.average(poll_id).await?,
            feedback: self.votes.list_feedback(poll_id).await?,
        })
    }

    /// Polls ever created, including purged ones.
    pub async fn total_polls(&self) -> Result<i64, RotiError> {
        self.polls.max_sequence().await
    }

    /// Polls currently stored.
    pub async fn active_polls(&self) -> Result<i64, RotiError> {
        self.polls.count().await
    }
}
