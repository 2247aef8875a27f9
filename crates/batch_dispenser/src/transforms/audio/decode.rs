use crate::transforms::Transform;
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::trace;

/// Samples in a 30 s mono clip at 44.1 kHz, as found in the source dataset.
pub const DEFAULT_CLIP_SAMPLES: usize = 1_321_967;

/// Converts signed 16-bit little-endian mono PCM into exactly `clip_samples`
/// floats in `[-1, 1)`.
///
/// Longer input is truncated, shorter input is zero-padded. A trailing odd
/// byte is ignored.
pub fn pcm_s16le_to_f32(bytes: &[u8], clip_samples: usize) -> Vec<f32> {
    let mut samples: Vec<f32> = bytes
        .chunks_exact(2)
        .take(clip_samples)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    samples.resize(clip_samples, 0.0);
    samples
}

// ============================================================================
// FfmpegDecoder - decode any container through an ffmpeg subprocess
// ============================================================================

/// Decodes audio files by piping them through `ffmpeg` as mono s16le.
///
/// Runs `ffmpeg -i <file> -f s16le -acodec pcm_s16le -ac 1 -` and reads the
/// raw samples from stdout. This is the fastest and least CPU-hungry option
/// for mp3 input, at the cost of one process per clip.
///
/// # Input/Output
/// - **Input**: `PathBuf` - audio file
/// - **Output**: `Vec<f32>` - `clip_samples` values in `[-1, 1)`
///
/// # Example
/// ```ignore
/// let decoder = FfmpegDecoder::default();
/// let samples = decoder.apply(PathBuf::from("fma_small/Rock/2.mp3"))?;
/// assert_eq!(samples.len(), DEFAULT_CLIP_SAMPLES);
/// ```
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    program: PathBuf,
    clip_samples: usize,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            clip_samples: DEFAULT_CLIP_SAMPLES,
        }
    }
}

impl FfmpegDecoder {
    pub fn new(clip_samples: usize) -> Self {
        Self {
            clip_samples,
            ..Self::default()
        }
    }

    /// Use a specific ffmpeg binary instead of the one on `PATH`.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn clip_samples(&self) -> usize {
        self.clip_samples
    }

    fn decode(&self, path: &Path) -> Result<Vec<f32>> {
        let output = Command::new(&self.program)
            .arg("-i")
            .arg(path)
            .args(["-f", "s16le", "-acodec", "pcm_s16le", "-ac", "1", "-"])
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {}", self.program.display()))?;

        if !output.status.success() {
            bail!(
                "{} failed on {} ({}): {}",
                self.program.display(),
                path.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        trace!(
            path = %path.display(),
            bytes = output.stdout.len(),
            "Decoded clip"
        );
        Ok(pcm_s16le_to_f32(&output.stdout, self.clip_samples))
    }
}

impl Transform<PathBuf, Vec<f32>> for FfmpegDecoder {
    fn apply(&self, path: PathBuf) -> Result<Vec<f32>> {
        self.decode(&path)
    }
}

// ============================================================================
// PcmFileDecoder - read pre-decoded raw PCM
// ============================================================================

/// Reads files that already hold raw mono s16le samples.
///
/// Interchangeable with [`FfmpegDecoder`] when the dataset was decoded
/// ahead of time; no subprocess per clip.
#[derive(Debug, Clone)]
pub struct PcmFileDecoder {
    clip_samples: usize,
}

impl Default for PcmFileDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_CLIP_SAMPLES)
    }
}

impl PcmFileDecoder {
    pub fn new(clip_samples: usize) -> Self {
        Self { clip_samples }
    }

    pub fn clip_samples(&self) -> usize {
        self.clip_samples
    }
}

impl Transform<PathBuf, Vec<f32>> for PcmFileDecoder {
    fn apply(&self, path: PathBuf) -> Result<Vec<f32>> {
        let bytes = fs::read(&path)
            .with_context(|| format!("Failed to read PCM file: {}", path.display()))?;
        Ok(pcm_s16le_to_f32(&bytes, self.clip_samples))
    }
}
