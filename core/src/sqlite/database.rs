//! SQLite connection pool and schema management.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

use crate::error::RotiError;

const CREATE_ROTI_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS roti (
        id          INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
        rotiid      INTEGER NOT NULL,
        description TEXT,
        hide        INTEGER,
        feedback    INTEGER DEFAULT 0,
        created_at  INTEGER
    )
"#;

const CREATE_VOTE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS vote (
        id       TEXT NOT NULL PRIMARY KEY,
        value    REAL,
        roti     INTEGER,
        feedback TEXT
    )
"#;

const CREATE_ROTIID_UNIQUE_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS roti_rotiid_unique ON roti (rotiid)";

const CREATE_VOTE_ROTI_INDEX: &str = "CREATE INDEX IF NOT EXISTS vote_roti ON vote (roti)";

/// Columns added after the first release. Older databases get them through
/// `ALTER TABLE ... ADD COLUMN`, existing rows keep their data.
const BACKFILLED_COLUMNS: &[(&str, &str, &str)] = &[
    ("roti", "feedback", "INTEGER DEFAULT 0"),
    ("roti", "created_at", "INTEGER"),
    ("vote", "feedback", "TEXT"),
];

/// Holds the single shared connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at `path` and bring its schema up to date.
    pub async fn open(path: &Path) -> Result<Self, RotiError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let existed = path.exists();
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        if existed {
            tracing::info!(path = %path.display(), "Re-using existing database file");
        } else {
            tracing::info!(path = %path.display(), "Created database file");
        }

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Open an isolated in-memory database with the schema applied.
    ///
    /// Every `:memory:` connection is its own database, so the pool keeps
    /// exactly one connection alive for its whole lifetime.
    pub async fn in_memory() -> Result<Self, RotiError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    /// Create missing tables, backfill columns added since older releases
    /// and normalise legacy `created_at` values. Safe to run repeatedly.
    async fn ensure_schema(&self) -> Result<(), RotiError> {
        sqlx::query(CREATE_ROTI_TABLE).execute(&self.pool).await?;
        sqlx::query(CREATE_VOTE_TABLE).execute(&self.pool).await?;

        for (table, column, definition) in BACKFILLED_COLUMNS {
            if !self.column_exists(table, column).await? {
                let statement = format!("ALTER TABLE {table} ADD COLUMN {column} {definition}");
                sqlx::query(&statement).execute(&self.pool).await?;
                tracing::info!(table, column, "Added missing column");
            }
        }

        // Older releases stored CURRENT_TIMESTAMP / CURRENT_DATE text.
        let normalised = sqlx::query(
            r#"
            UPDATE roti
            SET created_at = CAST(strftime('%s', created_at) AS INTEGER)
            WHERE typeof(created_at) = 'text'
              AND strftime('%s', created_at) IS NOT NULL
            "#,
        )
        .execute(&self.pool)
        .await?
        .rows_affected();
        if normalised > 0 {
            tracing::info!(rows = normalised, "Converted textual created_at values to unix seconds");
        }

        let stamped = sqlx::query("UPDATE roti SET created_at = ? WHERE created_at IS NULL OR typeof(created_at) = 'text'")
            .bind(super::now_timestamp() as i64)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if stamped > 0 {
            tracing::info!(rows = stamped, "Stamped polls missing a creation date with the current time");
        }

        if let Err(e) = sqlx::query(CREATE_ROTIID_UNIQUE_INDEX).execute(&self.pool).await {
            tracing::warn!(
                "No unique index on poll ids, existing rows hold duplicates; inserts fall back to an existence guard: {}",
                e
            );
        }
        sqlx::query(CREATE_VOTE_ROTI_INDEX).execute(&self.pool).await?;

        Ok(())
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, RotiError> {
        let columns: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info(?)")
                .bind(table)
                .fetch_all(&self.pool)
                .await?;

        if columns.is_empty() {
            return Err(RotiError::Schema(format!("table '{table}' does not exist")));
        }
        Ok(columns.iter().any(|(name,)| name == column))
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
