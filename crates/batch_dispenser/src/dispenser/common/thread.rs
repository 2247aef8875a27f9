//! Thread-local storage for worker identification.
//!
//! Pool threads record their ID on startup so that log events emitted deep
//! inside `Loader::next` can say which worker dropped or stalled a batch.

use std::cell::Cell;

thread_local! {
    /// Thread-local worker ID.
    ///
    /// Set to `Some(0..num_workers)` by `WorkerPool` when a worker thread is
    /// spawned. Threads the pool did not spawn (including callers driving a
    /// `Loader` directly) keep `None`.
    pub static WORKER_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

/// Marks the current thread as pool worker `worker_id`.
pub(crate) fn set_worker_id(worker_id: usize) {
    WORKER_ID.with(|id| id.set(Some(worker_id)));
}

/// ID of the pool worker running on this thread, if any.
pub fn current_worker_id() -> Option<usize> {
    WORKER_ID.with(|id| id.get())
}
