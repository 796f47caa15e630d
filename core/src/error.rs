//! Error taxonomy shared by every component of the poll engine.

/// Errors surfaced by the poll engine.
///
/// `InvalidId` and `InvalidVote` are caller mistakes and are never logged as
/// faults. `Storage` and `ExhaustedIdSpace` are logged where they occur and
/// then propagated unchanged.
#[derive(Debug, thiserror::Error)]
pub enum RotiError {
    #[error("invalid poll id: {0}")]
    InvalidId(String),

    #[error("no poll matching id {0}")]
    NotFound(i64),

    #[error("invalid vote value: {0}")]
    InvalidVote(String),

    #[error("couldn't find a free poll id after {attempts} attempts")]
    ExhaustedIdSpace { attempts: u32 },

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema error: {0}")]
    Schema(String),
}

impl RotiError {
    /// True when the underlying storage rejected a write because of a unique
    /// constraint. Poll creation retries this class with a fresh id.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RotiError::Storage(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

pub type Result<T, E = RotiError> = std::result::Result<T, E>;
