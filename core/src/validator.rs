//! Vote value validation.

use serde::Serialize;
use std::fmt;

use crate::error::RotiError;

/// Lowest accepted rating.
pub const MIN_RATING: f64 = 1.0;

/// Highest accepted rating.
pub const MAX_RATING: f64 = 5.0;

/// A vote value known to lie in `[1.0, 5.0]`.
///
/// Only constructible through validation, so repositories never see an
/// out-of-range value.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(into = "f64")]
pub struct Rating(f64);

impl Rating {
    pub fn new(value: f64) -> Result<Self, RotiError> {
        if value.is_finite() && (MIN_RATING..=MAX_RATING).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RotiError::InvalidVote(value.to_string()))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<Rating> for f64 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}", self.0)
    }
}

/// Parse and range-check a raw vote value.
pub fn validate_vote(raw: &str) -> Result<Rating, RotiError> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| RotiError::InvalidVote(raw.to_string()))?;
    Rating::new(value).map_err(|_| RotiError::InvalidVote(raw.to_string()))
}
