use crate::transforms::Transform;
use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One row of a track listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub track_id: u64,
    /// Top-level genre; also the directory the audio file lives in.
    pub genre: String,
}

impl Track {
    pub fn new(track_id: u64, genre: impl Into<String>) -> Self {
        Self {
            track_id,
            genre: genre.into(),
        }
    }
}

/// Track metadata addressed by dataset index.
///
/// Index `i` of the dispenser's index set refers to `tracks[i]`.
#[derive(Debug, Clone, Default)]
pub struct TrackTable {
    tracks: Vec<Track>,
}

impl TrackTable {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Every valid index, in table order.
    pub fn indices(&self) -> Vec<usize> {
        (0..self.tracks.len()).collect()
    }

    /// Distinct genres, sorted. Position in this list is the class id.
    pub fn genres(&self) -> Vec<String> {
        self.tracks
            .iter()
            .map(|t| t.genre.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Audio file of track `index`: `<data_dir>/<genre>/<track_id>.mp3`.
    pub fn path(&self, data_dir: &Path, index: usize) -> Result<PathBuf> {
        let track = self.get(index).ok_or_else(|| {
            anyhow!(
                "Track index {} out of range (table has {} tracks)",
                index,
                self.tracks.len()
            )
        })?;
        Ok(data_dir
            .join(&track.genre)
            .join(format!("{}.mp3", track.track_id)))
    }
}

/// Resolves a dataset index to its audio file path.
///
/// # Input/Output
/// - **Input**: `usize` - dataset index
/// - **Output**: `PathBuf` - `<data_dir>/<genre>/<track_id>.mp3`
#[derive(Debug, Clone)]
pub struct PathResolver {
    tracks: Arc<TrackTable>,
    data_dir: PathBuf,
}

impl PathResolver {
    pub fn new(tracks: Arc<TrackTable>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            tracks,
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Transform<usize, PathBuf> for PathResolver {
    fn apply(&self, index: usize) -> Result<PathBuf> {
        self.tracks.path(&self.data_dir, index)
    }
}
