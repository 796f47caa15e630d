//! Poll id allocation.
//!
//! Ids come from a small, human-typeable space (`[10000, 99999]`), so
//! collisions are possible. Rather than checking for a free id and inserting
//! afterwards, the allocator hands each candidate to a *claim* step that
//! inserts atomically; a unique-constraint violation is a collision and the
//! next candidate is drawn. The loop is bounded so a nearly full id space
//! fails loudly instead of spinning.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::sync::Mutex;

use crate::error::RotiError;
use crate::types::{PollId, MAX_POLL_ID, MIN_POLL_ID};

/// Maximum number of colliding candidates before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 1000;

/// Source of candidate poll ids.
pub trait IdSource: Send {
    fn next_id(&mut self) -> PollId;
}

/// Uniform random ids drawn from one generator seeded at construction.
pub struct RandomIdSource {
    rng: StdRng,
}

impl RandomIdSource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source, handy for reproducible tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIdSource {
    fn default() -> Self {
        Self::new()
    }
}

impl IdSource for RandomIdSource {
    fn next_id(&mut self) -> PollId {
        PollId::from_range_draw(self.rng.gen_range(MIN_POLL_ID..=MAX_POLL_ID))
    }
}

/// Outcome of trying to claim a candidate id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Claimed,
    Taken,
}

/// Draws candidate ids and retries collisions up to
/// [`MAX_ALLOCATION_ATTEMPTS`] times.
pub struct IdAllocator<S = RandomIdSource> {
    source: Mutex<S>,
    max_attempts: u32,
}

impl IdAllocator<RandomIdSource> {
    pub fn random() -> Self {
        Self::new(RandomIdSource::new())
    }
}

impl<S: IdSource> IdAllocator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Mutex::new(source),
            max_attempts: MAX_ALLOCATION_ATTEMPTS,
        }
    }

    /// Draw the next candidate id.
    pub fn candidate(&self) -> PollId {
        // A poisoned lock only means another caller panicked mid-draw; the
        // generator state is still usable.
        let mut source = self.source.lock().unwrap_or_else(|e| e.into_inner());
        source.next_id()
    }

    /// Allocate an id by repeatedly drawing candidates and handing them to
    /// `claim`. `Claim::Taken` retries; any error aborts the allocation.
    pub async fn allocate<F, Fut>(&self, mut claim: F) -> Result<PollId, RotiError>
    where
        F: FnMut(PollId) -> Fut,
        Fut: Future<Output = Result<Claim, RotiError>>,
    {
        for attempt in 0..self.max_attempts {
            let candidate = self.candidate();
            match claim(candidate).await? {
                Claim::Claimed => return Ok(candidate),
                Claim::Taken => {
                    tracing::debug!(poll_id = %candidate, attempt, "Poll id already taken, drawing another");
                }
            }
        }

        tracing::error!(attempts = self.max_attempts, "Exhausted poll id space");
        Err(RotiError::ExhaustedIdSpace {
            attempts: self.max_attempts,
        })
    }
}
