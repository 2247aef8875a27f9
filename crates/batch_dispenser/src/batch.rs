use crate::error::{DispenserError, Result};
use crate::example::Example;

/// Reusable, worker-private storage for one batch.
///
/// Holds a row-major `batch_size x feature_width` feature matrix, a
/// `batch_size x label_width` label matrix and the dataset indices of the
/// rows. A worker allocates one of these once (see
/// [`Loader::buffers`](crate::dispenser::Loader::buffers)) and passes it to
/// every `next()` call; each call overwrites the rows in place.
///
/// The [`Batch`] returned by `next()` borrows these buffers, so the compiler
/// enforces that a batch is fully consumed (or copied with
/// [`Batch::to_owned`]) before the next one is requested.
#[derive(Debug, Clone)]
pub struct BatchBuffers {
    features: Vec<f32>,
    labels: Vec<f32>,
    ids: Vec<usize>,
    batch_size: usize,
    feature_width: usize,
    label_width: usize,
}

impl BatchBuffers {
    pub fn new(batch_size: usize, feature_width: usize, label_width: usize) -> Self {
        Self {
            features: vec![0.0; batch_size * feature_width],
            labels: vec![0.0; batch_size * label_width],
            ids: Vec::with_capacity(batch_size),
            batch_size,
            feature_width,
            label_width,
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn feature_width(&self) -> usize {
        self.feature_width
    }

    pub fn label_width(&self) -> usize {
        self.label_width
    }

    /// Checks that these buffers fit a loader's shape.
    pub(crate) fn fits(&self, batch_size: usize, feature_width: usize, label_width: usize) -> bool {
        self.batch_size >= batch_size
            && self.feature_width == feature_width
            && self.label_width == label_width
    }

    /// Starts filling a new batch for the given claimed ids.
    pub(crate) fn reset(&mut self, ids: &[usize]) {
        debug_assert!(ids.len() <= self.batch_size);
        self.ids.clear();
        self.ids.extend_from_slice(ids);
    }

    /// Copies `example` into row `row`, validating both widths.
    pub(crate) fn write_row(&mut self, row: usize, index: usize, example: &Example) -> Result<()> {
        if example.features.len() != self.feature_width {
            return Err(DispenserError::ShapeMismatch {
                index,
                what: "feature",
                expected: self.feature_width,
                actual: example.features.len(),
            });
        }
        if example.label.len() != self.label_width {
            return Err(DispenserError::ShapeMismatch {
                index,
                what: "label",
                expected: self.label_width,
                actual: example.label.len(),
            });
        }

        let f = row * self.feature_width;
        self.features[f..f + self.feature_width].copy_from_slice(&example.features);
        let l = row * self.label_width;
        self.labels[l..l + self.label_width].copy_from_slice(&example.label);
        Ok(())
    }

    /// Returns the view over the first `ids.len()` rows.
    pub(crate) fn view(&self, offset: usize, pass: u64) -> Batch<'_> {
        let len = self.ids.len();
        Batch {
            features: &self.features[..len * self.feature_width],
            labels: &self.labels[..len * self.label_width],
            ids: &self.ids,
            feature_width: self.feature_width,
            label_width: self.label_width,
            offset,
            pass,
        }
    }
}

/// A published batch, borrowed from the worker's [`BatchBuffers`].
///
/// `len()` equals the configured batch size except for the final batch of a
/// pass when the index set is not a multiple of it.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    features: &'a [f32],
    labels: &'a [f32],
    ids: &'a [usize],
    feature_width: usize,
    label_width: usize,
    offset: usize,
    pass: u64,
}

impl<'a> Batch<'a> {
    /// Number of rows in the batch.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Row-major `len x feature_width` feature matrix.
    pub fn features(&self) -> &'a [f32] {
        self.features
    }

    /// Row-major `len x label_width` label matrix.
    pub fn labels(&self) -> &'a [f32] {
        self.labels
    }

    /// Dataset indices of the rows, in row order.
    pub fn ids(&self) -> &'a [usize] {
        self.ids
    }

    pub fn feature_row(&self, row: usize) -> &'a [f32] {
        &self.features[row * self.feature_width..(row + 1) * self.feature_width]
    }

    pub fn label_row(&self, row: usize) -> &'a [f32] {
        &self.labels[row * self.label_width..(row + 1) * self.label_width]
    }

    pub fn feature_width(&self) -> usize {
        self.feature_width
    }

    pub fn label_width(&self) -> usize {
        self.label_width
    }

    /// Offset of the first row within the pass's shuffled order.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Pass (epoch) the batch was drawn from, starting at 1.
    pub fn pass(&self) -> u64 {
        self.pass
    }

    /// Copies the batch out of the worker's buffers.
    pub fn to_owned(&self) -> OwnedBatch {
        OwnedBatch {
            features: self.features.to_vec(),
            labels: self.labels.to_vec(),
            ids: self.ids.to_vec(),
            feature_width: self.feature_width,
            label_width: self.label_width,
            offset: self.offset,
            pass: self.pass,
        }
    }
}

/// A batch that owns its storage, for handing across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedBatch {
    pub features: Vec<f32>,
    pub labels: Vec<f32>,
    pub ids: Vec<usize>,
    pub feature_width: usize,
    pub label_width: usize,
    pub offset: usize,
    pub pass: u64,
}

impl OwnedBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn feature_row(&self, row: usize) -> &[f32] {
        &self.features[row * self.feature_width..(row + 1) * self.feature_width]
    }

    pub fn label_row(&self, row: usize) -> &[f32] {
        &self.labels[row * self.label_width..(row + 1) * self.label_width]
    }
}
