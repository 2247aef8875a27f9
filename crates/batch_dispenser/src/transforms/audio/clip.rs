use crate::example::Example;
use crate::transforms::audio::{LabelTable, PathResolver, TrackTable};
use crate::transforms::core::Chain;
use crate::transforms::Transform;
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

/// Pairs a features transform with a label table into an [`Example`].
///
/// # Input/Output
/// - **Input**: `usize` - dataset index
/// - **Output**: `Example` - `features.apply(index)` and `labels.row(index)`
///
/// # Example
/// ```ignore
/// let tracks = Arc::new(TrackTable::new(rows));
/// let labels = Arc::new(LabelTable::from_tracks(&tracks)?);
/// let transform = ClipTransform::from_tracks(tracks, "fma_small", labels, FfmpegDecoder::default());
/// let loader = Loader::new(ids, transform, label_width, DEFAULT_CLIP_SAMPLES, 32)?;
/// ```
#[derive(Debug, Clone)]
pub struct ClipTransform<F> {
    features: F,
    labels: Arc<LabelTable>,
}

impl<F> ClipTransform<F> {
    pub fn new(features: F, labels: Arc<LabelTable>) -> Self {
        Self { features, labels }
    }

    pub fn label_width(&self) -> usize {
        self.labels.width()
    }
}

impl<D> ClipTransform<Chain<PathResolver, D, PathBuf>>
where
    D: Transform<PathBuf, Vec<f32>>,
{
    /// Resolves each index to `<data_dir>/<genre>/<track_id>.mp3` and decodes
    /// it with `decoder`.
    pub fn from_tracks(
        tracks: Arc<TrackTable>,
        data_dir: impl Into<PathBuf>,
        labels: Arc<LabelTable>,
        decoder: D,
    ) -> Self {
        Self::new(PathResolver::new(tracks, data_dir).then::<D, Vec<f32>>(decoder), labels)
    }
}

impl<F> Transform<usize, Example> for ClipTransform<F>
where
    F: Transform<usize, Vec<f32>>,
{
    fn apply(&self, index: usize) -> Result<Example> {
        let features = self.features.apply(index)?;
        let label = self.labels.apply(index)?;
        Ok(Example::new(features, label))
    }
}
