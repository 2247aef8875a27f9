//! Audio-clip transforms for genre classification datasets.
//!
//! An index is resolved to a track file (`<data_dir>/<genre>/<track_id>.mp3`),
//! decoded to a fixed number of mono samples and paired with its one-hot
//! genre label:
//!
//! ```text
//!  index ──PathResolver──> PathBuf ──FfmpegDecoder──> Vec<f32> ─┐
//!    │                                                          ├─> Example
//!    └────────────────────LabelTable────────────────> Vec<f32> ─┘
//! ```
//!
//! The dispenser core never depends on anything in here.

pub mod clip;
pub mod decode;
pub mod labels;
pub mod tracks;

pub use clip::ClipTransform;
pub use decode::{pcm_s16le_to_f32, FfmpegDecoder, PcmFileDecoder, DEFAULT_CLIP_SAMPLES};
pub use labels::LabelTable;
pub use tracks::{PathResolver, Track, TrackTable};
