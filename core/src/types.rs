//! Domain types for polls and their aggregate statistics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::RotiError;

/// Lowest public poll id.
pub const MIN_POLL_ID: i64 = 10_000;

/// Highest public poll id.
pub const MAX_POLL_ID: i64 = 99_999;

/// Public, human-typeable poll identifier in `[10000, 99999]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct PollId(i64);

impl PollId {
    pub fn new(value: i64) -> Result<Self, RotiError> {
        if (MIN_POLL_ID..=MAX_POLL_ID).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RotiError::InvalidId(value.to_string()))
        }
    }

    /// Wrap a value already drawn from `[MIN_POLL_ID, MAX_POLL_ID]`.
    pub(crate) fn from_range_draw(value: i64) -> Self {
        debug_assert!((MIN_POLL_ID..=MAX_POLL_ID).contains(&value));
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PollId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PollId {
    type Err = RotiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| RotiError::InvalidId(s.to_string()))?;
        Self::new(value)
    }
}

impl TryFrom<i64> for PollId {
    type Error = RotiError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PollId> for i64 {
    fn from(id: PollId) -> Self {
        id.0
    }
}

/// A stored poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub description: String,
    /// Hidden polls stay addressable by id but never show up in listings.
    pub hidden: bool,
    pub feedback_enabled: bool,
    /// Unix seconds.
    pub created_at: u64,
    /// Insertion order, used for "most recent" listings.
    pub sequence: i64,
}

/// Fields supplied when creating a poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPoll {
    pub description: String,
    pub hidden: bool,
    pub feedback_enabled: bool,
}

impl NewPoll {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn feedback_enabled(mut self, enabled: bool) -> Self {
        self.feedback_enabled = enabled;
        self
    }
}

/// Listing entry for the recent public polls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSummary {
    pub id: PollId,
    pub description: String,
}

/// Aggregate view of a poll's votes. `min`, `max` and `average` are `0.0`
/// when the poll has no votes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollStats {
    pub count: i64,
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub feedback: Vec<String>,
}
