use std::collections::HashSet;
use std::sync::Arc;

use super::{now_timestamp, Database, SqlitePollRepository, SqliteVoteRepository};
use crate::allocator::tests::ScriptedIdSource;
use crate::allocator::IdAllocator;
use crate::error::RotiError;
use crate::service::{RotiService, SqliteRotiService};
use crate::types::{NewPoll, PollId, PollStats};

const DAY: i64 = 24 * 60 * 60;

async fn service() -> (Database, SqliteRotiService) {
    let db = Database::in_memory().await.unwrap();
    let service = SqliteRotiService::sqlite(&db);
    (db, service)
}

async fn backdate(db: &Database, id: PollId, days: i64) {
    sqlx::query("UPDATE roti SET created_at = ? WHERE rotiid = ?")
        .bind(now_timestamp() as i64 - days * DAY)
        .bind(id.get())
        .execute(db.pool())
        .await
        .unwrap();
}

async fn vote(service: &SqliteRotiService, id: PollId, raw: &str, feedback: &str) {
    let rating = service.validate_vote(raw).unwrap();
    service.add_vote(id, rating, feedback).await.unwrap();
}

#[tokio::test]
async fn test_full_poll_lifecycle() {
    let (_db, service) = service().await;
    let id = service
        .create_poll(&NewPoll::new("Sprint 42 retro").feedback_enabled(true), 30)
        .await
        .unwrap();

    vote(&service, id, "4.5", "Good").await;
    vote(&service, id, "3", "").await;

    let poll = service.get_poll(id).await.unwrap();
    assert_eq!(poll.description, "Sprint 42 retro");
    assert!(poll.feedback_enabled);

    let stats = service.poll_stats(id).await.unwrap();
    assert_eq!(
        stats,
        PollStats {
            count: 2,
            min: 3.0,
            max: 4.5,
            average: 3.75,
            feedback: vec!["(4.5) Good".to_string()],
        }
    );
}

#[tokio::test]
async fn test_stats_for_three_and_four() {
    let (_db, service) = service().await;
    let id = service.create_poll(&NewPoll::new("stats"), 30).await.unwrap();
    vote(&service, id, "3.0", "").await;
    vote(&service, id, "4.0", "").await;

    let stats = service.poll_stats(id).await.unwrap();
    assert_eq!(stats.min, 3.0);
    assert_eq!(stats.max, 4.0);
    assert_eq!(stats.average, 3.5);
}

#[tokio::test]
async fn test_stats_of_poll_without_votes() {
    let (_db, service) = service().await;
    let id = service.create_poll(&NewPoll::new("quiet"), 30).await.unwrap();
    let stats = service.poll_stats(id).await.unwrap();
    assert_eq!(
        stats,
        PollStats {
            count: 0,
            min: 0.0,
            max: 0.0,
            average: 0.0,
            feedback: vec![],
        }
    );
}

#[tokio::test]
async fn test_get_missing_poll_is_not_found() {
    let (_db, service) = service().await;
    let id: PollId = "99999".parse().unwrap();
    assert!(matches!(service.get_poll(id).await, Err(RotiError::NotFound(99999))));
}

#[tokio::test]
async fn test_vote_on_missing_poll_is_rejected() {
    let (db, service) = service().await;
    let id = PollId::new(12345).unwrap();
    let rating = service.validate_vote("4").unwrap();
    assert!(matches!(
        service.add_vote(id, rating, "").await,
        Err(RotiError::NotFound(12345))
    ));

    let (votes,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vote")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(votes, 0);
}

#[tokio::test]
async fn test_invalid_votes_never_reach_storage() {
    let (_db, service) = service().await;
    for raw in ["0.999", "5.001", "abc"] {
        assert!(matches!(service.validate_vote(raw), Err(RotiError::InvalidVote(_))));
    }
}

#[tokio::test]
async fn test_created_ids_are_in_range_and_unique() {
    let (_db, service) = service().await;
    let mut ids = HashSet::new();
    for i in 0..100 {
        let id = service.create_poll(&NewPoll::new(format!("p{i}")), 30).await.unwrap();
        assert!((10_000..=99_999).contains(&id.get()));
        assert!(ids.insert(id));
    }
    assert_eq!(service.active_polls().await.unwrap(), 100);
    assert_eq!(service.total_polls().await.unwrap(), 100);
}

#[tokio::test]
async fn test_creation_purges_expired_polls_and_votes() {
    let (db, service) = service().await;
    let expired = service.create_poll(&NewPoll::new("expired"), 30).await.unwrap();
    let kept = service.create_poll(&NewPoll::new("kept"), 30).await.unwrap();
    vote(&service, expired, "2", "meh").await;
    vote(&service, kept, "5", "great").await;
    backdate(&db, expired, 31).await;
    backdate(&db, kept, 29).await;

    service.create_poll(&NewPoll::new("trigger"), 30).await.unwrap();

    assert!(matches!(service.get_poll(expired).await, Err(RotiError::NotFound(_))));
    assert_eq!(service.poll_stats(expired).await.unwrap().count, 0);
    assert_eq!(service.get_poll(kept).await.unwrap().description, "kept");
    assert_eq!(service.poll_stats(kept).await.unwrap().count, 1);

    assert_eq!(service.active_polls().await.unwrap(), 2);
    // The sequence keeps counting purged polls.
    assert_eq!(service.total_polls().await.unwrap(), 3);
}

#[tokio::test]
async fn test_listing_is_recent_public_polls_only() {
    let (_db, service) = service().await;
    let first = service.create_poll(&NewPoll::new("first"), 30).await.unwrap();
    service.create_poll(&NewPoll::new("secret").hidden(true), 30).await.unwrap();
    let third = service.create_poll(&NewPoll::new("third"), 30).await.unwrap();

    let list = service.list_recent_polls().await.unwrap();
    let ids: Vec<PollId> = list.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![third, first]);
}

#[tokio::test]
async fn test_concurrent_creations_get_distinct_ids() {
    // Every creation draws 12345 first; only one can win it.
    let db = Database::in_memory().await.unwrap();
    let polls = SqlitePollRepository::with_allocator(
        db.pool().clone(),
        IdAllocator::new(ScriptedIdSource::new(vec![12345; 8], 23456)),
    );
    let service = Arc::new(RotiService::new(polls, SqliteVoteRepository::new(db.pool().clone())));

    let a = tokio::spawn({
        let service = service.clone();
        async move { service.create_poll(&NewPoll::new("a"), 30).await }
    });
    let b = tokio::spawn({
        let service = service.clone();
        async move { service.create_poll(&NewPoll::new("b"), 30).await }
    });

    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_ne!(a, b);
    let mut got = vec![a.get(), b.get()];
    got.sort_unstable();
    assert_eq!(got, vec![12345, 23456]);
}

#[tokio::test]
async fn test_file_backed_service_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roti.db");

    let id = {
        let db = Database::open(&path).await.unwrap();
        let service = SqliteRotiService::sqlite(&db);
        let id = service.create_poll(&NewPoll::new("persisted"), 30).await.unwrap();
        vote(&service, id, "4", "nice").await;
        db.pool().close().await;
        id
    };

    let db = Database::open(&path).await.unwrap();
    let service = SqliteRotiService::sqlite(&db);
    assert_eq!(service.get_poll(id).await.unwrap().description, "persisted");
    assert_eq!(service.poll_stats(id).await.unwrap().feedback, vec!["(4.0) nice"]);
}

#[tokio::test]
async fn test_stats_serialize_to_json() {
    let (_db, service) = service().await;
    let id = service.create_poll(&NewPoll::new("json"), 30).await.unwrap();
    vote(&service, id, "5", "top").await;

    let json = serde_json::to_value(service.poll_stats(id).await.unwrap()).unwrap();
    assert_eq!(json["count"], 1);
    assert_eq!(json["average"], 5.0);
    assert_eq!(json["feedback"][0], "(5.0) top");
}
