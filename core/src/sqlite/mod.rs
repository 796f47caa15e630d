//! SQLite-backed storage for polls and votes.
//!
//! [`Database`] owns the single shared `sqlx::SqlitePool` and the table
//! lifecycle. Each repository holds a clone of that pool:
//!
//! | Type | Role |
//! |------|------|
//! | [`SqlitePollRepository`] | `PollRepository`, drives sweep + allocation on create |
//! | [`SqliteVoteRepository`] | `VoteRepository` |
//! | [`RetentionSweeper`] | deletes polls and votes past the retention window |
//!
//! Table `roti` keeps the public id in `rotiid` and the insertion order in
//! its `id` primary key. Votes reference polls through `vote.roti = rotiid`;
//! there is no foreign key, the sweeper removes votes itself.

mod database;
mod poll_repo;
mod sweeper;
mod vote_repo;
#[cfg(test)]
mod integration_tests;

pub use database::Database;
pub use poll_repo::{SqlitePollRepository, MAX_RECENT_POLLS};
pub use sweeper::{RetentionSweeper, SweepReport};
pub use vote_repo::{ceil_hundredths, SqliteVoteRepository};

use std::time::{SystemTime, UNIX_EPOCH};

/// Get the current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
