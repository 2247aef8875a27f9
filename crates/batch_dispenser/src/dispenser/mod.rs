//! src/dispenser/mod.rs
//!
//! This module implements the bounded-lag batch dispenser.
//!
//! Several workers share one `Loader`. Each worker claims a contiguous slice
//! of a shuffled index set, runs the (slow) per-index transform in parallel
//! with everyone else, then publishes the batch only once it is within one
//! batch-size of the most recently published batch.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌───────────────┐
//!                  │  IndexBuffer  │ shuffled index set + foremost cursor
//!                  └───────┬───────┘
//!                          │ claim(): short critical section,
//!                          │ reshuffles at offset 0
//!                          ↓
//!                  ┌───────────────┐
//!                  │   Transform   │ index → Example, no lock held
//!                  └───────┬───────┘
//!                          │ rows written into the worker's BatchBuffers
//!                          ↓
//!                  ┌───────────────┐
//!                  │   OrderGate   │ wait until (start - rearmost) mod N
//!                  └───────┬───────┘ ≤ batch_size, then rearmost = start
//!                          │
//!                          ↓
//!                   ┌─────────────┐
//!                   │    Batch    │ borrowed view, valid until next()
//!                   └─────────────┘
//!
//!            [WorkerPool] (optional) runs N threads over one Loader and
//!            forwards OwnedBatch copies through a bounded channel
//! ```
//!
//! # Module Structure
//!
//! ```text
//! src/dispenser/
//! ├── mod.rs             # Public API exports + architecture docs
//! ├── config.rs          # DispenserConfig, builder, and validation
//! ├── index_buffer.rs    # IndexBuffer and Claim (claim-lock)
//! ├── order_gate.rs      # OrderGate (publish-lock, rearmost marker)
//! ├── loader.rs          # Loader::next and BatchIter
//! ├── workers/
//! │   ├── mod.rs         # Module declarations
//! │   └── pool.rs        # WorkerPool
//! └── common/
//!     ├── mod.rs         # Module declarations for shared utilities
//!     └── thread.rs      # Thread-local worker ID
//! ```
//!
//! # Example Usage
//!
//! ## Driving the loader from your own threads
//! ```ignore
//! let loader = Arc::new(Loader::new(ids, transform, label_width, feature_width, 32)?);
//! let mut buffers = loader.buffers();
//! let batch = loader.next(&mut buffers)?;
//! train_step(batch.features(), batch.labels());
//! ```
//!
//! ## With a worker pool
//! ```ignore
//! let config = DispenserConfig::builder()
//!     .batch_size(32)
//!     .feature_width(DEFAULT_CLIP_SAMPLES)
//!     .label_width(16)
//!     .num_workers(4)
//!     .build();
//!
//! let loader = Arc::new(Loader::with_config(ids, transform, config)?);
//! let pool = WorkerPool::spawn(loader)?;
//! for batch in pool.take(1000) {
//!     let batch = batch?;
//!     // ...
//! }
//! ```
//!
//! # Ordering guarantees
//! - Every index is delivered exactly once per pass
//! - Published offsets never jump more than one batch-size ahead of the
//!   previous one
//! - Batches inside that window may still be published out of order
//!
//! # Memory Usage
//! - Per worker: one `BatchBuffers` (batch_size x (feature_width + label_width))
//! - Pool: up to num_workers x prefetch_factor owned batches in flight

mod common;
mod config;
mod index_buffer;
mod loader;
mod order_gate;
mod workers;

pub use common::thread::{current_worker_id, WORKER_ID};
pub use config::{DispenserConfig, DispenserConfigBuilder};
pub use index_buffer::{Claim, IndexBuffer};
pub use loader::{BatchIter, Loader};
pub use order_gate::{OrderGate, PublishTicket};
pub use workers::pool::WorkerPool;
