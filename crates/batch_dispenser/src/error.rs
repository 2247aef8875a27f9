//! Error types for the batch dispenser.
//!
//! Construction problems, per-index transform failures and the lag-gate
//! liveness hazard are kept as distinct variants so callers can decide
//! between skipping a batch and tearing the run down.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispenserError {
    /// Invalid construction parameters (batch size, index set, widths).
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The external transform failed for a single index.
    #[error("Transform failed for index {index}")]
    Transform {
        index: usize,
        #[source]
        source: anyhow::Error,
    },

    /// The transform returned a vector of the wrong length.
    #[error("Transform for index {index} produced {actual} {what} values, expected {expected}")]
    ShapeMismatch {
        index: usize,
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A batch could not be published within the configured deadline.
    ///
    /// This almost always means another worker claimed an earlier slice and
    /// never published or abandoned it.
    #[error(
        "Batch at offset {start} waited {waited:?} for the lag window \
         (rearmost offset {rearmost}, lag {lag} > batch size) - a worker may be stalled"
    )]
    LagTimeout {
        start: usize,
        rearmost: usize,
        lag: usize,
        waited: Duration,
    },

    /// The order gate was closed while waiting (loader shutdown).
    #[error("Order gate closed")]
    Closed,

    /// A pool consumer waited longer than `recv_timeout` for a batch.
    #[error("No batch received from worker pool within {0:?}")]
    RecvTimeout(Duration),

    #[error("Failed to spawn worker thread {worker}")]
    Spawn {
        worker: usize,
        #[source]
        source: std::io::Error,
    },
}

impl DispenserError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn transform(index: usize, source: anyhow::Error) -> Self {
        Self::Transform { index, source }
    }

    /// Returns true if the error only affects the batch that raised it.
    ///
    /// A lag timeout drops its batch but the gate keeps the turn and
    /// releases it once the slow batch lands, so later calls can proceed.
    /// A closed gate or a failed setup ends the loader for everyone.
    pub fn is_batch_local(&self) -> bool {
        matches!(
            self,
            DispenserError::Transform { .. }
                | DispenserError::ShapeMismatch { .. }
                | DispenserError::LagTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DispenserError>;
