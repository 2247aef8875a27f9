//! src/dispenser/order_gate.rs
//!
//! Bounded-lag publication gate.
//!
//! A worker that has filled a batch calls [`OrderGate::publish`] with the
//! batch's offset. The call blocks until the batch is within one batch-size
//! (cyclically, in permutation offsets) of the most recently published batch,
//! the *rearmost* marker, then moves the marker to its own offset.
//!
//! ```text
//!  N = 10, batch_size = 4, rearmost = 4
//!
//!  offset 8  lag (8 - 4) mod 10 = 4  <= 4  -> publishes
//!  offset 0  lag (0 - 4) mod 10 = 6  >  4  -> waits for offset 8
//! ```
//!
//! This is not a FIFO: batches inside the window may still publish out of
//! offset order. It only stops a fast worker from running many batches ahead
//! of a slow one.
//!
//! # Monitor protocol
//! `rearmost` lives under the same mutex as the condition variable. Waiters
//! re-check the predicate after every wake, and every marker change wakes
//! *all* waiters because the predicate is relative: one move can admit
//! several pending batches at once.
//!
//! # Liveness
//! A worker that claims a slice and never publishes or abandons it blocks
//! every later batch once the window is exhausted. The optional timeout turns
//! that stall into [`DispenserError::LagTimeout`] instead of a silent hang.
//!
//! A batch that times out is not delivered, but its turn is not lost either.
//! The gate remembers the offset as a deferred turn and releases it as soon
//! as the marker comes within one batch-size of it, exactly where the batch
//! would have published. A worker that is only slow therefore costs the
//! timed-out batch and nothing after it.

use parking_lot::{Condvar, Mutex};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

use crate::error::{DispenserError, Result};

/// Proof that a batch passed the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishTicket {
    /// Offset that is now the rearmost marker.
    pub offset: usize,
    /// Marker value the batch was admitted against.
    pub previous: usize,
    /// Cyclic distance from `previous` to `offset`; never above batch size.
    pub lag: usize,
}

struct GateState {
    rearmost: usize,
    closed: bool,
    /// Offsets whose publish timed out; released once the window reaches them.
    deferred: BTreeSet<usize>,
}

/// Publish-lock, rearmost marker and wait condition.
pub struct OrderGate {
    state: Mutex<GateState>,
    turn: Condvar,
    len: usize,
    batch_size: usize,
    timeout: Option<Duration>,
}

/// Distance from `from` forward to `to` on a ring of `len` offsets.
///
/// Both offsets are below `len`, so adding `len` first keeps the
/// subtraction non-negative; the result is always in `[0, len)`.
#[inline]
pub(crate) fn cyclic_distance(to: usize, from: usize, len: usize) -> usize {
    (to + len - from) % len
}

impl OrderGate {
    /// Creates a gate for a ring of `len` offsets.
    ///
    /// The marker starts one batch-size behind offset 0, so the first batch
    /// of the first pass is admitted immediately.
    pub fn new(len: usize, batch_size: usize, timeout: Option<Duration>) -> Result<Self> {
        if len == 0 {
            return Err(DispenserError::config("index set must not be empty"));
        }
        if batch_size == 0 {
            return Err(DispenserError::config("batch_size must be greater than 0"));
        }

        Ok(Self {
            state: Mutex::new(GateState {
                rearmost: (len - batch_size % len) % len,
                closed: false,
                deferred: BTreeSet::new(),
            }),
            turn: Condvar::new(),
            len,
            batch_size,
            timeout,
        })
    }

    /// Blocks until `offset` is inside the lag window, then makes it the
    /// rearmost marker.
    ///
    /// # Errors
    /// - `LagTimeout` if the configured timeout elapses first; the offset's
    ///   turn is deferred and released later without delivery
    /// - `Closed` if the gate is closed while waiting
    pub fn publish(&self, offset: usize) -> Result<PublishTicket> {
        let ticket = self.advance(offset)?;
        trace!(offset, lag = ticket.lag, "Published batch");
        Ok(ticket)
    }

    /// Releases the turn of a batch that will never be delivered.
    ///
    /// Waits for the same predicate as [`publish`](Self::publish) and moves
    /// the marker, so batches claimed after the abandoned one are not
    /// stranded behind it.
    pub fn abandon(&self, offset: usize) -> Result<PublishTicket> {
        let ticket = self.advance(offset)?;
        trace!(offset, lag = ticket.lag, "Abandoned batch turn");
        Ok(ticket)
    }

    fn advance(&self, offset: usize) -> Result<PublishTicket> {
        debug_assert!(offset < self.len);
        let started = Instant::now();
        let deadline = self.timeout.map(|t| started + t);

        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(DispenserError::Closed);
            }

            let lag = cyclic_distance(offset, state.rearmost, self.len);
            if lag <= self.batch_size {
                let previous = state.rearmost;
                state.rearmost = offset;
                self.release_deferred(&mut state);
                self.turn.notify_all();
                return Ok(PublishTicket {
                    offset,
                    previous,
                    lag,
                });
            }

            match deadline {
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        let waited = started.elapsed();
                        error!(
                            offset,
                            rearmost = state.rearmost,
                            lag,
                            ?waited,
                            "Lag window did not open in time, a worker may be stalled"
                        );
                        state.deferred.insert(offset);
                        return Err(DispenserError::LagTimeout {
                            start: offset,
                            rearmost: state.rearmost,
                            lag,
                            waited,
                        });
                    }
                    self.turn.wait_until(&mut state, deadline);
                }
                None => self.turn.wait(&mut state),
            }
        }
    }

    /// Moves the marker through every deferred turn that is now inside the
    /// window. Each release can bring the next deferred offset into range.
    fn release_deferred(&self, state: &mut GateState) {
        loop {
            let rearmost = state.rearmost;
            let next = state
                .deferred
                .iter()
                .copied()
                .filter(|&offset| cyclic_distance(offset, rearmost, self.len) <= self.batch_size)
                .min_by_key(|&offset| cyclic_distance(offset, rearmost, self.len));
            let Some(offset) = next else { break };

            state.deferred.remove(&offset);
            state.rearmost = offset;
            debug!(offset, previous = rearmost, "Released deferred batch turn");
        }
    }

    /// Wakes every waiter with `Closed` and rejects later calls.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.turn.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Offset of the most recently published (or abandoned) batch.
    pub fn rearmost(&self) -> usize {
        self.state.lock().rearmost
    }

    /// Offsets that timed out and are still waiting for the window.
    pub fn deferred(&self) -> Vec<usize> {
        self.state.lock().deferred.iter().copied().collect()
    }

    /// Current lag of `offset` against the marker, without waiting.
    pub fn lag_of(&self, offset: usize) -> usize {
        cyclic_distance(offset, self.state.lock().rearmost, self.len)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
