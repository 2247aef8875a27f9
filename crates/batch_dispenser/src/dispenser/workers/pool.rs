//! Worker pool driving a shared `Loader` from several threads.
//!
//! Each worker owns its own `BatchBuffers` and loops `Loader::next()`,
//! copying every published batch into an `OwnedBatch` and sending it over a
//! bounded output channel. Consumers pull from that channel.
//!
//! # Key features
//! - Bounded output channel (`num_workers * prefetch_factor`) caps memory
//! - Graceful shutdown on drop: flag, close the gate, join
//! - Thread-local worker IDs tag log events
//!
//! # Error routing
//! Batch-local errors (`Transform`, `ShapeMismatch`, `LagTimeout`) are
//! forwarded and the worker keeps going; the batch's turn is either released
//! already or deferred inside the gate. Anything else (`Closed`) is forwarded
//! once and the worker exits, since the loader has shut down.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, SendTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use crate::batch::OwnedBatch;
use crate::dispenser::common::thread::set_worker_id;
use crate::dispenser::Loader;
use crate::error::{DispenserError, Result};
use crate::example::Example;
use crate::transforms::Transform;

type Output = Result<OwnedBatch>;

/// Thread pool that keeps a `Loader` busy.
///
/// Manages worker lifecycle and communication:
/// - Output channel: Workers -> consumers (owned batches or errors)
/// - Shutdown flag: stops workers between batches
/// - Gate close: wakes workers blocked in `publish`
pub struct WorkerPool<T> {
    workers: Vec<thread::JoinHandle<()>>,
    output_rx: Receiver<Output>,
    shutdown: Arc<AtomicBool>,
    loader: Arc<Loader<T>>,
    recv_timeout: Duration,
}

impl<T> WorkerPool<T>
where
    T: Transform<usize, Example> + 'static,
{
    /// Spawns `config.num_workers` threads pulling from `loader`.
    ///
    /// # Errors
    /// - `Config` if the pool parameters are invalid
    /// - `Spawn` if a thread could not be started (already started workers
    ///   are shut down)
    pub fn spawn(loader: Arc<Loader<T>>) -> Result<Self> {
        let config = loader.config().clone();
        config.validate_pool()?;

        let (output_tx, output_rx) = bounded(config.num_workers * config.prefetch_factor);
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut pool = Self {
            workers: Vec::with_capacity(config.num_workers),
            output_rx,
            shutdown,
            loader,
            recv_timeout: config.recv_timeout,
        };

        for worker_id in 0..config.num_workers {
            let loader = pool.loader.clone();
            let output_tx = output_tx.clone();
            let shutdown = pool.shutdown.clone();
            let poll = config.worker_timeout;

            let handle = thread::Builder::new()
                .name(format!("dispenser-worker-{}", worker_id))
                .spawn(move || {
                    set_worker_id(worker_id);
                    run_worker(&loader, &output_tx, &shutdown, poll);
                    debug!(worker = worker_id, "Worker exiting");
                })
                .map_err(|source| DispenserError::Spawn {
                    worker: worker_id,
                    source,
                })?;

            pool.workers.push(handle);
        }

        info!(
            workers = config.num_workers,
            prefetch = config.prefetch_factor,
            batch_size = config.batch_size,
            "Started worker pool"
        );
        Ok(pool)
    }
}

impl<T> WorkerPool<T> {
    /// Blocks for the next batch, up to the configured `recv_timeout`.
    ///
    /// # Errors
    /// - errors forwarded from workers
    /// - `RecvTimeout` if nothing arrives in time
    /// - `Closed` once every worker has exited and the channel is drained
    pub fn recv(&self) -> Result<OwnedBatch> {
        self.recv_timeout(self.recv_timeout)
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<OwnedBatch> {
        match self.output_rx.recv_timeout(timeout) {
            Ok(output) => output,
            Err(RecvTimeoutError::Timeout) => Err(DispenserError::RecvTimeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(DispenserError::Closed),
        }
    }

    /// Returns a ready batch without blocking, or `None`.
    pub fn try_recv(&self) -> Option<Result<OwnedBatch>> {
        match self.output_rx.try_recv() {
            Ok(output) => Some(output),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(DispenserError::Closed)),
        }
    }

    /// Clone of the output channel, for additional consumer threads.
    pub fn receiver(&self) -> Receiver<Output> {
        self.output_rx.clone()
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    pub fn loader(&self) -> &Arc<Loader<T>> {
        &self.loader
    }

    /// Stops the workers and waits for them to exit.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        // Signal shutdown, then wake anyone blocked in the gate
        self.shutdown.store(true, Ordering::Relaxed);
        self.loader.close();

        let count = self.workers.len();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        info!(workers = count, "Stopped worker pool");
    }
}

/// Blocking iteration over the pool's output; ends once all workers exit.
impl<T> Iterator for WorkerPool<T> {
    type Item = Result<OwnedBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.recv() {
            Err(DispenserError::Closed) if self.output_rx.is_empty() => None,
            other => Some(other),
        }
    }
}

impl<T> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker<T>(loader: &Loader<T>, output_tx: &Sender<Output>, shutdown: &AtomicBool, poll: Duration)
where
    T: Transform<usize, Example>,
{
    let mut buffers = loader.buffers();

    while !shutdown.load(Ordering::Relaxed) {
        let output = loader.next(&mut buffers).map(|batch| batch.to_owned());
        let fatal = matches!(&output, Err(err) if !err.is_batch_local());

        if !send_until_shutdown(output_tx, output, shutdown, poll) || fatal {
            break;
        }
    }
}

/// Sends `output`, re-checking the shutdown flag every `poll` while the
/// channel is full. Returns false if the worker should stop.
fn send_until_shutdown(
    output_tx: &Sender<Output>,
    mut output: Output,
    shutdown: &AtomicBool,
    poll: Duration,
) -> bool {
    loop {
        match output_tx.send_timeout(output, poll) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => {
                if shutdown.load(Ordering::Relaxed) {
                    return false;
                }
                output = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}
