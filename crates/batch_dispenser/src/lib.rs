//! Bounded-lag concurrent batch dispensing.
//!
//! Several workers share a shuffled index set, claim disjoint contiguous
//! slices of it, transform each index into an [`Example`] in parallel, and
//! publish the resulting batches under a bounded-lag rule: a batch is only
//! released once it is within one batch-size of the most recently published
//! one. See [`dispenser`] for the full picture.

pub mod batch;
pub mod dispenser;
pub mod error;
pub mod example;
pub mod transforms;

pub use batch::{Batch, BatchBuffers, OwnedBatch};
pub use dispenser::{DispenserConfig, DispenserConfigBuilder, Loader, WorkerPool};
pub use error::{DispenserError, Result};
pub use example::Example;
pub use transforms::{Chain, Transform};
