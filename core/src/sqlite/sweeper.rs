//! Opportunistic retention sweep.

use sqlx::SqlitePool;

use super::now_timestamp;
use crate::error::RotiError;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub polls_removed: u64,
    pub votes_removed: u64,
    /// Polls that matched the cutoff but could not be removed.
    pub failures: u64,
}

/// Deletes polls older than a retention window, together with their votes.
///
/// Failures on one poll are logged and skipped; the sweep is maintenance and
/// never fails the operation that triggered it.
#[derive(Clone)]
pub struct RetentionSweeper {
    pool: SqlitePool,
}

impl RetentionSweeper {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Remove every poll created more than `retention_days` days ago.
    pub async fn sweep(&self, retention_days: u32) -> SweepReport {
        let cutoff = now_timestamp().saturating_sub(u64::from(retention_days) * SECONDS_PER_DAY);
        self.sweep_before(cutoff).await
    }

    /// Remove every poll whose `created_at` is strictly before `cutoff`
    /// (unix seconds).
    pub async fn sweep_before(&self, cutoff: u64) -> SweepReport {
        let mut report = SweepReport::default();

        let expired = match self.expired_polls(cutoff).await {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!("Error retrieving expired polls: {}", e);
                return report;
            }
        };

        for (sequence, poll_id) in expired {
            match self.remove_poll(sequence, poll_id).await {
                Ok(votes) => {
                    tracing::info!(poll_id, votes, "Removed expired poll");
                    report.polls_removed += 1;
                    report.votes_removed += votes;
                }
                Err(e) => {
                    tracing::warn!(poll_id, sequence, "Skipping expired poll: {}", e);
                    report.failures += 1;
                }
            }
        }

        if report != SweepReport::default() {
            tracing::info!(
                polls = report.polls_removed,
                votes = report.votes_removed,
                failures = report.failures,
                "Retention sweep finished"
            );
        }
        report
    }

    async fn expired_polls(&self, cutoff: u64) -> Result<Vec<(i64, i64)>, RotiError> {
        let rows: Vec<(i64, i64)> =
            sqlx::query_as("SELECT id, rotiid FROM roti WHERE created_at < ? ORDER BY id")
                .bind(cutoff as i64)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    /// Delete the votes of one poll, then the poll row. Returns the number
    /// of votes removed.
    async fn remove_poll(&self, sequence: i64, poll_id: i64) -> Result<u64, RotiError> {
        let votes = sqlx::query("DELETE FROM vote WHERE roti = ?")
            .bind(poll_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM roti WHERE id = ?")
            .bind(sequence)
            .execute(&self.pool)
            .await?;

        Ok(votes)
    }
}
