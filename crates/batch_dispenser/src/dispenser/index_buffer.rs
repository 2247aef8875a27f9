//! src/dispenser/index_buffer.rs
//!
//! The shared, shuffled index set and its claim cursor.
//!
//! `IndexBuffer` holds one permutation of the caller's index set plus the
//! offset of the next unclaimed position (`foremost`). Workers call
//! [`IndexBuffer::claim`] to reserve the next contiguous slice. Everything
//! happens under one short critical section (the claim-lock), so claiming
//! never waits on publishing or on any transform.
//!
//! # Pass boundaries
//! A claim that starts at offset 0 reshuffles the whole buffer first, inside
//! the same critical section. No slice ever spans two permutations and every
//! index is handed out exactly once per pass.
//!
//! ```text
//!  N = 10, batch_size = 4
//!
//!  pass 1   [ 7 2 9 0 | 4 1 8 3 | 6 5 ]      claims: (0,4) (4,4) (8,2)
//!             ^ reshuffle when foremost == 0
//!  pass 2   [ 3 8 0 6 | 1 9 2 7 | 5 4 ]      claims: (0,4) ...
//! ```

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashSet;
use tracing::{debug, trace};

use crate::error::{DispenserError, Result};

/// A contiguous slice of one pass's permutation, reserved for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    offset: usize,
    ids: Vec<usize>,
    pass: u64,
}

impl Claim {
    /// Offset of the first id within the pass's permutation.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Claimed dataset indices, in permutation order.
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Pass the slice belongs to, starting at 1.
    pub fn pass(&self) -> u64 {
        self.pass
    }
}

struct IndexState {
    ids: Vec<usize>,
    foremost: usize,
    pass: u64,
    rng: StdRng,
}

/// Fixed-capacity shuffled index set shared by all workers.
pub struct IndexBuffer {
    state: Mutex<IndexState>,
    batch_size: usize,
    len: usize,
}

impl IndexBuffer {
    /// Creates a buffer over `index_set`.
    ///
    /// The first claim shuffles, so the initial order of `index_set` is
    /// never observed. `seed` makes the sequence of permutations
    /// reproducible; `None` seeds from OS entropy.
    ///
    /// # Errors
    /// - `batch_size` is 0
    /// - `index_set` is empty or contains duplicates
    pub fn new(index_set: Vec<usize>, batch_size: usize, seed: Option<u64>) -> Result<Self> {
        if batch_size == 0 {
            return Err(DispenserError::config("batch_size must be greater than 0"));
        }
        if index_set.is_empty() {
            return Err(DispenserError::config("index set must not be empty"));
        }

        let mut seen = HashSet::with_capacity(index_set.len());
        for &index in &index_set {
            if !seen.insert(index) {
                return Err(DispenserError::config(format!(
                    "index set contains duplicate index {}",
                    index
                )));
            }
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let len = index_set.len();
        Ok(Self {
            state: Mutex::new(IndexState {
                ids: index_set,
                foremost: 0,
                pass: 0,
                rng,
            }),
            batch_size,
            len,
        })
    }

    /// Reserves the next contiguous slice of the current permutation.
    ///
    /// Returns at most `batch_size` ids; only the last slice of a pass can
    /// be shorter. Concurrent callers always receive disjoint slices.
    pub fn claim(&self) -> Claim {
        let mut state = self.state.lock();
        let state = &mut *state;

        if state.foremost == 0 {
            state.ids.shuffle(&mut state.rng);
            state.pass += 1;
            debug!(pass = state.pass, len = self.len, "Reshuffled index buffer");
        }

        let offset = state.foremost;
        let len = self.batch_size.min(self.len - offset);
        let ids = state.ids[offset..offset + len].to_vec();
        state.foremost = (offset + len) % self.len;

        trace!(pass = state.pass, offset, len, "Claimed slice");
        Claim {
            offset,
            ids,
            pass: state.pass,
        }
    }

    /// Number of indices in one pass.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Offset of the next unclaimed position.
    pub fn foremost(&self) -> usize {
        self.state.lock().foremost
    }

    /// Number of passes started so far (0 before the first claim).
    pub fn pass(&self) -> u64 {
        self.state.lock().pass
    }

    /// Copy of the current permutation.
    pub fn permutation(&self) -> Vec<usize> {
        self.state.lock().ids.clone()
    }
}
