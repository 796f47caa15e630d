//! SQLite-backed repository for votes and their aggregates.

use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::RotiError;
use crate::traits::VoteRepository;
use crate::types::PollId;
use crate::validator::Rating;

/// Round `value` up to two decimals.
///
/// Ceiling, not nearest: a mean of 5.5049 reports 5.51 and anything above a
/// whole cent, however slightly, reports the next cent. The only exception is
/// the rounding error of the scaling itself (1.1 * 100 is
/// 110.00000000000001): a scaled value within one ulp of an integer is that
/// integer.
pub fn ceil_hundredths(value: f64) -> f64 {
    let scaled = value * 100.0;
    let nearest = scaled.round();
    if (scaled - nearest).abs() <= f64::EPSILON * nearest.abs() {
        // `+ 0.0` turns a -0.0 result into 0.0.
        return nearest / 100.0 + 0.0;
    }
    scaled.ceil() / 100.0
}

/// SQLite implementation of [`VoteRepository`].
pub struct SqliteVoteRepository {
    pool: SqlitePool,
}

impl SqliteVoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run a single-value aggregate over the votes of one poll.
    async fn aggregate(&self, poll_id: PollId, sql: &'static str) -> Result<Option<f64>, RotiError> {
        let (value,): (Option<f64>,) = sqlx::query_as(sql)
            .bind(poll_id.get())
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(poll_id = %poll_id, "Failed to aggregate votes: {}", e))?;
        Ok(value)
    }
}

impl VoteRepository for SqliteVoteRepository {
    async fn add_vote(&self, poll_id: PollId, rating: Rating, feedback: &str) -> Result<(), RotiError> {
        let vote_id = Uuid::new_v4().to_string();
        tracing::info!(poll_id = %poll_id, vote_id = %vote_id, "Inserting vote");

        sqlx::query("INSERT INTO vote (id, value, roti, feedback) VALUES (?, ?, ?, ?)")
            .bind(&vote_id)
            .bind(rating.value())
            .bind(poll_id.get())
            .bind(feedback)
            .execute(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(poll_id = %poll_id, "Failed to insert vote: {}", e))?;

        Ok(())
    }

    async fn count_votes(&self, poll_id: PollId) -> Result<i64, RotiError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vote WHERE roti = ?")
            .bind(poll_id.get())
            .fetch_one(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(poll_id = %poll_id, "Failed to count votes: {}", e))?;
        Ok(count)
    }

    async fn min_vote(&self, poll_id: PollId) -> Result<f64, RotiError> {
        let min = self
            .aggregate(poll_id, "SELECT CAST(MIN(value) AS REAL) FROM vote WHERE roti = ?")
            .await?;
        Ok(min.unwrap_or(0.0))
    }

    async fn max_vote(&self, poll_id: PollId) -> Result<f64, RotiError> {
        let max = self
            .aggregate(poll_id, "SELECT CAST(MAX(value) AS REAL) FROM vote WHERE roti = ?")
            .await?;
        Ok(max.unwrap_or(0.0))
    }

    async fn average(&self, poll_id: PollId) -> Result<f64, RotiError> {
        let avg = self
            .aggregate(poll_id, "SELECT AVG(CAST(value AS REAL)) FROM vote WHERE roti = ?")
            .await?;
        Ok(ceil_hundredths(avg.unwrap_or(0.0)))
    }

    async fn list_feedback(&self, poll_id: PollId) -> Result<Vec<String>, RotiError> {
        let rows: Vec<(f64, Option<String>)> = sqlx::query_as(
            r#"
            SELECT CAST(value AS REAL), feedback
            FROM vote
            WHERE roti = ?
            ORDER BY rowid
            "#,
        )
        .bind(poll_id.get())
        .fetch_all(&self.pool)
        .await
        .inspect_err(|e| tracing::error!(poll_id = %poll_id, "Failed to list feedback: {}", e))?;

        Ok(rows
            .into_iter()
            .filter_map(|(value, feedback)| {
                feedback
                    .filter(|text| !text.is_empty())
                    .map(|text| format!("({value:.1}) {text}"))
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::Database;

    async fn test_db() -> (Database, SqliteVoteRepository) {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteVoteRepository::new(db.pool().clone());
        (db, repo)
    }

    fn poll(id: i64) -> PollId {
        PollId::new(id).unwrap()
    }

    async fn add_votes(repo: &SqliteVoteRepository, poll_id: PollId, votes: &[(f64, &str)]) {
        for (value, feedback) in votes {
            repo.add_vote(poll_id, Rating::new(*value).unwrap(), feedback)
                .await
                .unwrap();
        }
    }

    #[test]
    fn test_ceil_hundredths_rounds_up() {
        assert_eq!(ceil_hundredths(5.5049), 5.51);
        assert_eq!(ceil_hundredths(4.0 / 3.0), 1.34);
        assert_eq!(ceil_hundredths(2.001), 2.01);
    }

    #[test]
    fn test_ceil_hundredths_just_above_a_cent() {
        assert_eq!(ceil_hundredths(3.000000000001), 3.01);
        assert_eq!(ceil_hundredths(4.5 + 1e-12), 4.51);
        assert_eq!(ceil_hundredths(1.0 + f64::EPSILON * 64.0), 1.01);
    }

    #[test]
    fn test_ceil_hundredths_keeps_exact_values() {
        assert_eq!(ceil_hundredths(3.5), 3.5);
        assert_eq!(ceil_hundredths(1.1), 1.1);
        assert_eq!(ceil_hundredths(4.75), 4.75);
        assert!(ceil_hundredths(0.0).is_sign_positive());
    }

    #[tokio::test]
    async fn test_add_vote_counts() {
        let (_db, repo) = test_db().await;
        add_votes(&repo, poll(12345), &[(3.5, "test")]).await;
        assert_eq!(repo.count_votes(poll(12345)).await.unwrap(), 1);
        assert_eq!(repo.count_votes(poll(54321)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_vote_ids_are_unique_tokens() {
        let (db, repo) = test_db().await;
        add_votes(&repo, poll(12345), &[(3.0, ""), (3.0, "")]).await;
        let ids: Vec<(String,)> = sqlx::query_as("SELECT id FROM vote")
            .fetch_all(db.pool())
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0].0, ids[1].0);
        assert!(Uuid::parse_str(&ids[0].0).is_ok());
    }

    #[tokio::test]
    async fn test_min_max_average() {
        let (_db, repo) = test_db().await;
        let id = poll(12345);
        add_votes(&repo, id, &[(3.0, "test"), (4.0, "test")]).await;

        assert_eq!(repo.min_vote(id).await.unwrap(), 3.0);
        assert_eq!(repo.max_vote(id).await.unwrap(), 4.0);
        assert_eq!(repo.average(id).await.unwrap(), 3.5);
    }

    #[tokio::test]
    async fn test_average_rounds_up() {
        let (_db, repo) = test_db().await;
        let id = poll(12345);
        add_votes(&repo, id, &[(1.0, ""), (1.0, ""), (2.0, "")]).await;
        assert_eq!(repo.average(id).await.unwrap(), 1.34);
    }

    #[tokio::test]
    async fn test_average_never_under_reports() {
        let (_db, repo) = test_db().await;
        let id = poll(12345);
        let rating = crate::validator::validate_vote("3.000000000001").unwrap();
        repo.add_vote(id, rating, "").await.unwrap();
        assert_eq!(repo.average(id).await.unwrap(), 3.01);
    }

    #[tokio::test]
    async fn test_aggregates_without_votes_are_zero() {
        let (_db, repo) = test_db().await;
        let id = poll(12345);
        assert_eq!(repo.count_votes(id).await.unwrap(), 0);
        assert_eq!(repo.min_vote(id).await.unwrap(), 0.0);
        assert_eq!(repo.max_vote(id).await.unwrap(), 0.0);
        assert_eq!(repo.average(id).await.unwrap(), 0.0);
        assert!(repo.list_feedback(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_aggregates_are_scoped_to_poll() {
        let (_db, repo) = test_db().await;
        add_votes(&repo, poll(11111), &[(1.0, "low")]).await;
        add_votes(&repo, poll(22222), &[(5.0, "high")]).await;

        assert_eq!(repo.max_vote(poll(11111)).await.unwrap(), 1.0);
        assert_eq!(repo.min_vote(poll(22222)).await.unwrap(), 5.0);
        assert_eq!(repo.list_feedback(poll(22222)).await.unwrap(), vec!["(5.0) high"]);
    }

    #[tokio::test]
    async fn test_list_feedback() {
        let cases: Vec<(Vec<(f64, &str)>, Vec<&str>)> = vec![
            (
                vec![(4.5, "Good Roti"), (3.0, "Okay Roti")],
                vec!["(4.5) Good Roti", "(3.0) Okay Roti"],
            ),
            (vec![(2.5, "Bad Roti")], vec!["(2.5) Bad Roti"]),
            (vec![(4.5, "Good"), (3.0, "")], vec!["(4.5) Good"]),
        ];

        for (votes, expected) in cases {
            let (_db, repo) = test_db().await;
            let id = poll(12345);
            add_votes(&repo, id, &votes).await;
            assert_eq!(repo.list_feedback(id).await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_legacy_integer_and_null_rows() {
        let (db, repo) = test_db().await;
        sqlx::query("INSERT INTO vote (id, value, roti, feedback) VALUES ('a', 4, 12345, NULL), ('b', 2, 12345, 'meh')")
            .execute(db.pool())
            .await
            .unwrap();

        let id = poll(12345);
        assert_eq!(repo.min_vote(id).await.unwrap(), 2.0);
        assert_eq!(repo.max_vote(id).await.unwrap(), 4.0);
        assert_eq!(repo.average(id).await.unwrap(), 3.0);
        assert_eq!(repo.list_feedback(id).await.unwrap(), vec!["(2.0) meh"]);
    }
}
