//! SQLite-backed repository for polls.

use sqlx::SqlitePool;

use super::{now_timestamp, RetentionSweeper};
use crate::allocator::{Claim, IdAllocator, IdSource, RandomIdSource};
use crate::error::RotiError;
use crate::traits::PollRepository;
use crate::types::{NewPoll, Poll, PollId, PollSummary};

/// Upper bound for [`PollRepository::list_recent`].
pub const MAX_RECENT_POLLS: u32 = 10;

/// Row type for poll queries, mapped via `sqlx::FromRow`.
#[derive(sqlx::FromRow)]
struct PollRow {
    id: i64,
    rotiid: i64,
    description: Option<String>,
    hide: Option<bool>,
    feedback: Option<bool>,
    created_at: Option<i64>,
}

impl PollRow {
    fn into_poll(self) -> Result<Poll, RotiError> {
        Ok(Poll {
            id: PollId::new(self.rotiid)?,
            description: self.description.unwrap_or_default(),
            hidden: self.hide.unwrap_or(false),
            feedback_enabled: self.feedback.unwrap_or(false),
            created_at: self.created_at.unwrap_or(0).max(0) as u64,
            sequence: self.id,
        })
    }
}

/// SQLite implementation of [`PollRepository`].
pub struct SqlitePollRepository<S = RandomIdSource> {
    pool: SqlitePool,
    sweeper: RetentionSweeper,
    allocator: IdAllocator<S>,
}

impl SqlitePollRepository<RandomIdSource> {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_allocator(pool, IdAllocator::random())
    }
}

impl<S: IdSource> SqlitePollRepository<S> {
    pub fn with_allocator(pool: SqlitePool, allocator: IdAllocator<S>) -> Self {
        let sweeper = RetentionSweeper::new(pool.clone());
        Self {
            pool,
            sweeper,
            allocator,
        }
    }

    pub fn sweeper(&self) -> &RetentionSweeper {
        &self.sweeper
    }

    /// Insert the poll under `id` unless another poll already holds it.
    ///
    /// The existence guard lives in the same statement as the insert, so it
    /// still holds on legacy databases where duplicate rows prevented the
    /// unique index from being built. Where the index exists, a concurrent
    /// writer that wins the race surfaces as a unique violation instead.
    async fn try_insert(&self, id: PollId, poll: &NewPoll, created_at: u64) -> Result<Claim, RotiError> {
        let result = sqlx::query(
            r#"
            INSERT INTO roti (rotiid, description, hide, feedback, created_at)
            SELECT ?, ?, ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM roti WHERE rotiid = ?)
            "#,
        )
        .bind(id.get())
        .bind(&poll.description)
        .bind(poll.hidden)
        .bind(poll.feedback_enabled)
        .bind(created_at as i64)
        .bind(id.get())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(Claim::Taken),
            Ok(_) => Ok(Claim::Claimed),
            Err(e) => {
                let err = RotiError::from(e);
                if err.is_unique_violation() {
                    Ok(Claim::Taken)
                } else {
                    tracing::error!(poll_id = %id, "Failed to insert poll: {}", err);
                    Err(err)
                }
            }
        }
    }
}

impl<S: IdSource> PollRepository for SqlitePollRepository<S> {
    async fn create(&self, poll: &NewPoll, retention_days: u32) -> Result<PollId, RotiError> {
        tracing::debug!(retention_days, "Running opportunistic retention sweep");
        self.sweeper.sweep(retention_days).await;

        let created_at = now_timestamp();
        let id = self
            .allocator
            .allocate(|candidate| self.try_insert(candidate, poll, created_at))
            .await?;

        tracing::info!(
            poll_id = %id,
            description = %poll.description,
            hidden = poll.hidden,
            feedback = poll.feedback_enabled,
            "Created poll"
        );
        Ok(id)
    }

    async fn get(&self, id: PollId) -> Result<Poll, RotiError> {
        let row: Option<PollRow> = sqlx::query_as(
            r#"
            SELECT id, rotiid, description, hide, feedback, created_at
            FROM roti
            WHERE rotiid = ?
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(poll_id = %id, "Failed to load poll: {}", e))?;

        row.ok_or(RotiError::NotFound(id.get()))?.into_poll()
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<PollSummary>, RotiError> {
        let limit = limit.min(MAX_RECENT_POLLS);
        let rows: Vec<(i64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT rotiid, description
            FROM roti
            WHERE COALESCE(hide, 0) = 0
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!("Failed to list polls: {}", e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(rotiid, description)| match PollId::new(rotiid) {
                Ok(id) => Some(PollSummary {
                    id,
                    description: description.unwrap_or_default(),
                }),
                Err(e) => {
                    tracing::warn!(rotiid, "Skipping poll with unusable id in listing: {}", e);
                    None
                }
            })
            .collect())
    }

    async fn count(&self) -> Result<i64, RotiError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM roti")
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("Failed to count polls: {}", e))?;
        Ok(count)
    }

    async fn max_sequence(&self) -> Result<i64, RotiError> {
        let (max,): (Option<i64>,) = sqlx::query_as("SELECT MAX(id) FROM roti")
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!("Failed to read max poll sequence: {}", e))?;
        Ok(max.unwrap_or(0))
    }
}
