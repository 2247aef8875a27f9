/// A single transformed data item: its feature vector and its label vector.
///
/// This is what a [`Transform<usize, Example>`](crate::transforms::Transform)
/// hands back to the loader for each claimed index. Both vectors must have
/// the widths the loader was configured with; the loader copies them into
/// row `i` of the worker's batch buffers.
///
/// # Examples
/// - Audio clip: `features` = fixed-length PCM samples, `label` = one-hot genre
/// - Tabular row: `features` = normalized columns, `label` = regression targets
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub features: Vec<f32>,
    pub label: Vec<f32>,
}

impl Example {
    pub fn new(features: Vec<f32>, label: Vec<f32>) -> Self {
        Self { features, label }
    }

    pub fn feature_width(&self) -> usize {
        self.features.len()
    }

    pub fn label_width(&self) -> usize {
        self.label.len()
    }
}
