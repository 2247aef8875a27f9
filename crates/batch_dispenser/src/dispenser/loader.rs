//! src/dispenser/loader.rs
//!
//! The `Loader`: claim -> transform -> gated publish.
//!
//! One `Loader` is shared (usually through `Arc`) by every worker. Each
//! worker owns its own [`BatchBuffers`] and calls [`Loader::next`] in a loop:
//!
//! ```ignore
//! let loader = Arc::new(Loader::new(ids, transform, label_width, feature_width, 32)?);
//!
//! let handles: Vec<_> = (0..4).map(|_| {
//!     let loader = loader.clone();
//!     std::thread::spawn(move || -> Result<()> {
//!         let mut buffers = loader.buffers();
//!         loop {
//!             let batch = loader.next(&mut buffers)?;
//!             consume(batch.features(), batch.labels());
//!         }
//!     })
//! }).collect();
//! ```
//!
//! The stream never ends: after the last slice of a pass the next claim
//! reshuffles and starts over. Build a new `Loader` to restart from scratch.

use tracing::{error, warn};

use crate::batch::{Batch, BatchBuffers, OwnedBatch};
use crate::error::{DispenserError, Result};
use crate::example::Example;
use crate::transforms::Transform;

use super::common::thread::current_worker_id;
use super::config::DispenserConfig;
use super::index_buffer::{Claim, IndexBuffer};
use super::order_gate::OrderGate;

/// Shared synchronization core plus the injected per-index transform.
///
/// # Thread safety
/// `Loader<T>` is `Send + Sync` whenever `T` is (which `Transform` requires),
/// so `Arc<Loader<T>>` can be handed to any number of workers.
///
/// # Stalls
/// A worker that stops between claiming and publishing (a hung transform,
/// a thread that is parked forever) blocks every other worker once the lag
/// window is used up. With `lag_timeout` set, those workers fail with
/// [`DispenserError::LagTimeout`] instead of hanging. The timed-out batch is
/// dropped, but the gate keeps its turn and releases it once the slow batch
/// publishes, so a worker that was merely slow costs one batch per timeout.
pub struct Loader<T> {
    transform: T,
    index_buffer: IndexBuffer,
    gate: OrderGate,
    config: DispenserConfig,
}

impl<T> Loader<T>
where
    T: Transform<usize, Example>,
{
    /// Creates a loader with default timeouts.
    ///
    /// # Errors
    /// `DispenserError::Config` if `batch_size` or a width is 0, or if
    /// `index_set` is empty or has duplicates.
    pub fn new(
        index_set: Vec<usize>,
        transform: T,
        label_width: usize,
        feature_width: usize,
        batch_size: usize,
    ) -> Result<Self> {
        let config = DispenserConfig::builder()
            .batch_size(batch_size)
            .feature_width(feature_width)
            .label_width(label_width)
            .build();
        Self::with_config(index_set, transform, config)
    }

    /// Creates a loader from a full configuration.
    pub fn with_config(index_set: Vec<usize>, transform: T, config: DispenserConfig) -> Result<Self> {
        config.validate()?;

        let index_buffer = IndexBuffer::new(index_set, config.batch_size, config.seed)?;
        let gate = OrderGate::new(index_buffer.len(), config.batch_size, config.lag_timeout)?;

        Ok(Self {
            transform,
            index_buffer,
            gate,
            config,
        })
    }

    /// Allocates batch buffers shaped for this loader.
    pub fn buffers(&self) -> BatchBuffers {
        BatchBuffers::new(
            self.config.batch_size,
            self.config.feature_width,
            self.config.label_width,
        )
    }

    /// Produces the next batch into `buffers`.
    ///
    /// Claims a slice, runs the transform for each index outside any lock,
    /// then waits for the lag window before returning the view.
    ///
    /// # Errors
    /// - `Transform` / `ShapeMismatch`: this batch is dropped, its turn in
    ///   the publish order is released, and the next call proceeds normally
    /// - `LagTimeout`: another worker is slow or stalled; this batch is
    ///   dropped and its turn is released once the window reaches it
    /// - `Closed`: the loader was closed
    /// - `Config`: `buffers` were not created for this loader's shape
    pub fn next<'b>(&self, buffers: &'b mut BatchBuffers) -> Result<Batch<'b>> {
        if !buffers.fits(
            self.config.batch_size,
            self.config.feature_width,
            self.config.label_width,
        ) {
            return Err(DispenserError::config(format!(
                "batch buffers ({} x {} / {}) do not fit loader shape ({} x {} / {})",
                buffers.batch_size(),
                buffers.feature_width(),
                buffers.label_width(),
                self.config.batch_size,
                self.config.feature_width,
                self.config.label_width,
            )));
        }

        let claim = self.index_buffer.claim();
        buffers.reset(claim.ids());

        if let Err(err) = self.fill(&claim, buffers) {
            self.release_turn(&claim, &err);
            return Err(err);
        }

        self.gate.publish(claim.offset())?;
        Ok(buffers.view(claim.offset(), claim.pass()))
    }

    /// Runs the transform for every claimed index, in slice order.
    fn fill(&self, claim: &Claim, buffers: &mut BatchBuffers) -> Result<()> {
        for (row, &index) in claim.ids().iter().enumerate() {
            let example = self
                .transform
                .apply(index)
                .map_err(|source| DispenserError::transform(index, source))?;
            buffers.write_row(row, index, &example)?;
        }
        Ok(())
    }

    /// Keeps claim and publish balanced for a batch that will not be delivered.
    fn release_turn(&self, claim: &Claim, cause: &DispenserError) {
        warn!(
            worker = ?current_worker_id(),
            offset = claim.offset(),
            pass = claim.pass(),
            error = %cause,
            "Dropping batch, releasing its publish turn"
        );
        if let Err(abandon_err) = self.gate.abandon(claim.offset()) {
            error!(
                worker = ?current_worker_id(),
                offset = claim.offset(),
                error = %abandon_err,
                "Failed to release publish turn of dropped batch"
            );
        }
    }

    /// Single-threaded adapter yielding owned batches forever.
    pub fn batches(&self) -> BatchIter<'_, T> {
        BatchIter {
            loader: self,
            buffers: self.buffers(),
        }
    }
}

impl<T> Loader<T> {
    pub fn config(&self) -> &DispenserConfig {
        &self.config
    }

    pub fn index_buffer(&self) -> &IndexBuffer {
        &self.index_buffer
    }

    pub fn gate(&self) -> &OrderGate {
        &self.gate
    }

    /// Number of indices in one pass.
    pub fn len(&self) -> usize {
        self.index_buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_buffer.is_empty()
    }

    /// Fails every current and future publish with `Closed`.
    pub fn close(&self) {
        self.gate.close();
    }
}

/// Iterator over owned batches from one loader. Never returns `None`.
pub struct BatchIter<'a, T> {
    loader: &'a Loader<T>,
    buffers: BatchBuffers,
}

impl<T> Iterator for BatchIter<'_, T>
where
    T: Transform<usize, Example>,
{
    type Item = Result<OwnedBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(
            self.loader
                .next(&mut self.buffers)
                .map(|batch| batch.to_owned()),
        )
    }
}
