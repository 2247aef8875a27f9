//! Per-index transforms: the slow stage the dispenser runs outside its locks.
//!
//! - `core`: the `Transform` trait, closure support and `Chain`
//! - `audio`: track paths, one-hot genre labels and PCM decoders

pub mod audio;
pub mod core;

pub use self::core::{Chain, Transform};
