use crate::transforms::audio::TrackTable;
use crate::transforms::Transform;
use anyhow::{anyhow, ensure, Result};

/// Dense `rows x width` label matrix addressed by dataset index.
///
/// Row `i` is the label vector of index `i`. Usually built with
/// [`LabelTable::one_hot`] or [`LabelTable::from_tracks`].
///
/// # Input/Output
/// - **Input**: `usize` - dataset index
/// - **Output**: `Vec<f32>` - copy of row `index`, length `width`
#[derive(Debug, Clone)]
pub struct LabelTable {
    values: Vec<f32>,
    width: usize,
}

impl LabelTable {
    /// Wraps a row-major matrix. `values.len()` must be a multiple of `width`.
    pub fn new(values: Vec<f32>, width: usize) -> Result<Self> {
        ensure!(width > 0, "Label width must be greater than 0");
        ensure!(
            values.len() % width == 0,
            "Label matrix of {} values is not a multiple of width {}",
            values.len(),
            width
        );
        Ok(Self { values, width })
    }

    /// One row per entry of `assignments`, with a 1.0 at the assigned class.
    pub fn one_hot(classes: usize, assignments: &[usize]) -> Result<Self> {
        ensure!(classes > 0, "One-hot labels need at least one class");

        let mut values = vec![0.0; assignments.len() * classes];
        for (row, &class) in assignments.iter().enumerate() {
            ensure!(
                class < classes,
                "Class {} of row {} is out of range for {} classes",
                class,
                row,
                classes
            );
            values[row * classes + class] = 1.0;
        }
        Ok(Self {
            values,
            width: classes,
        })
    }

    /// One-hot genre labels; class ids follow [`TrackTable::genres`].
    pub fn from_tracks(tracks: &TrackTable) -> Result<Self> {
        let genres = tracks.genres();
        let assignments = (0..tracks.len())
            .filter_map(|i| tracks.get(i))
            .map(|t| {
                genres
                    .binary_search(&t.genre)
                    .map_err(|_| anyhow!("Genre {:?} missing from class list", t.genre))
            })
            .collect::<Result<Vec<usize>>>()?;
        Self::one_hot(genres.len(), &assignments)
    }

    pub fn rows(&self) -> usize {
        self.values.len() / self.width
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.width)?;
        let end = start.checked_add(self.width)?;
        self.values.get(start..end)
    }
}

impl Transform<usize, Vec<f32>> for LabelTable {
    fn apply(&self, index: usize) -> Result<Vec<f32>> {
        self.row(index).map(<[f32]>::to_vec).ok_or_else(|| {
            anyhow!(
                "Label index {} out of range (table has {} rows)",
                index,
                self.rows()
            )
        })
    }
}
