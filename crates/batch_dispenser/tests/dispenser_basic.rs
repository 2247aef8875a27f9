//! Single-threaded behaviour of the Loader.
//!
//! Tests cover:
//! - Batch shape (full batches, truncated final batch, batch larger than set)
//! - Pass coverage and reshuffling
//! - Seeded reproducibility
//! - Transform failures and shape errors
//! - The audio clip transform end to end

mod common;
use common::{decoded_index, echo, FailingTransform, IndexEcho};

use batch_dispenser::{
    transforms::audio::{ClipTransform, LabelTable, PcmFileDecoder, Track, TrackTable},
    DispenserConfig, DispenserError, Loader,
};

use anyhow::Result;
use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ============================================================================
// 1. Batch Shape
// ============================================================================

#[test]
fn test_ten_items_batch_four() -> Result<()> {
    let loader = Loader::new((0..10).collect(), IndexEcho::new(3, 2), 2, 3, 4)?;
    let mut buffers = loader.buffers();

    let mut sizes = Vec::new();
    let mut pass_one = HashSet::new();
    for _ in 0..3 {
        let batch = loader.next(&mut buffers)?;
        sizes.push(batch.len());
        assert_eq!(batch.features().len(), batch.len() * 3);
        assert_eq!(batch.labels().len(), batch.len() * 2);
        pass_one.extend(batch.ids().iter().copied());
    }
    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(pass_one, (0..10).collect());

    // Fourth call starts a new pass
    let batch = loader.next(&mut buffers)?;
    assert_eq!(batch.len(), 4);
    assert_eq!(batch.pass(), 2);
    assert_eq!(batch.offset(), 0);
    Ok(())
}

#[test]
fn test_rows_line_up_with_ids() -> Result<()> {
    let loader = Loader::new((0..16).collect(), IndexEcho::new(5, 3), 3, 5, 4)?;
    let mut buffers = loader.buffers();

    for _ in 0..8 {
        let batch = loader.next(&mut buffers)?;
        for (row, &id) in batch.ids().iter().enumerate() {
            assert_eq!(decoded_index(batch.feature_row(row)), id);
            assert_eq!(batch.label_row(row), echo(id, 5, 3).label.as_slice());
        }
    }
    Ok(())
}

#[test]
fn test_batch_size_larger_than_index_set() -> Result<()> {
    let loader = Loader::new(vec![4, 9, 2], IndexEcho::new(1, 1), 1, 1, 8)?;
    let mut buffers = loader.buffers();

    for pass in 1..=3 {
        let batch = loader.next(&mut buffers)?;
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.pass(), pass);
        let mut ids = batch.ids().to_vec();
        ids.sort_unstable();
        assert_eq!(ids, vec![2, 4, 9]);
    }
    Ok(())
}

#[test]
fn test_single_item_index_set() -> Result<()> {
    let loader = Loader::new(vec![42], IndexEcho::new(2, 1), 1, 2, 1)?;
    let mut buffers = loader.buffers();
    for _ in 0..5 {
        let batch = loader.next(&mut buffers)?;
        assert_eq!(batch.ids(), &[42]);
        assert_eq!(batch.feature_row(0), &[42.0, 42.0]);
    }
    Ok(())
}

// ============================================================================
// 2. Passes and Shuffling
// ============================================================================

#[test]
fn test_every_pass_is_a_permutation() -> Result<()> {
    let ids: Vec<usize> = vec![1000, 7, 42, 3, 999, 18, 64, 5, 11];
    let expected: HashSet<usize> = ids.iter().copied().collect();
    let loader = Loader::new(ids, IndexEcho::new(1, 1), 1, 1, 2)?;

    // 9 items, batch 2: five batches per pass
    let mut passes: Vec<Vec<usize>> = vec![Vec::new(); 4];
    for batch in loader.batches().take(20) {
        let batch = batch?;
        passes[(batch.pass - 1) as usize].extend(batch.ids.iter().copied());
    }

    for pass in &passes {
        assert_eq!(pass.len(), 9);
        assert_eq!(pass.iter().copied().collect::<HashSet<_>>(), expected);
    }
    Ok(())
}

#[test]
fn test_reshuffle_between_passes() -> Result<()> {
    let config = DispenserConfig::builder().batch_size(10).seed(17).build();
    let loader = Loader::with_config((0..100).collect(), IndexEcho::new(1, 1), config)?;

    let orders: Vec<Vec<usize>> = (0..3)
        .map(|_| {
            loader
                .batches()
                .take(10)
                .map(|b| b.map(|b| b.ids))
                .collect::<batch_dispenser::Result<Vec<_>>>()
                .map(|v| v.concat())
        })
        .collect::<batch_dispenser::Result<_>>()?;

    assert_ne!(orders[0], orders[1]);
    assert_ne!(orders[1], orders[2]);
    Ok(())
}

#[test]
fn test_same_seed_same_stream() -> Result<()> {
    let build = || -> Result<_> {
        let config = DispenserConfig::builder().batch_size(3).seed(2024).build();
        Ok(Loader::with_config(
            (0..25).collect(),
            IndexEcho::new(1, 1),
            config,
        )?)
    };
    let a = build()?;
    let b = build()?;

    for (x, y) in a.batches().zip(b.batches()).take(30) {
        assert_eq!(x?, y?);
    }
    Ok(())
}

// ============================================================================
// 3. Errors
// ============================================================================

#[test]
fn test_transform_error_skips_only_that_batch() -> Result<()> {
    let config = DispenserConfig::builder()
        .batch_size(2)
        .seed(5)
        .lag_timeout(Duration::from_millis(500))
        .build();
    let loader = Loader::with_config((0..10).collect(), FailingTransform::new([3]), config)?;
    let mut buffers = loader.buffers();

    let mut delivered = Vec::new();
    let mut failed = Vec::new();
    // Two full passes
    for _ in 0..10 {
        match loader.next(&mut buffers) {
            Ok(batch) => delivered.extend_from_slice(batch.ids()),
            Err(DispenserError::Transform { index, source }) => {
                assert_eq!(index, 3);
                assert!(source.to_string().contains("Corrupt item 3"));
                failed.push(index);
            }
            Err(other) => return Err(other.into()),
        }
    }

    // One failed batch per pass; its partner index is lost with it
    assert_eq!(failed, vec![3, 3]);
    assert_eq!(delivered.len(), 16);
    assert!(!delivered.contains(&3));
    Ok(())
}

#[test]
fn test_wrong_width_is_shape_mismatch() -> Result<()> {
    // Transform produces 4 features, loader expects 6
    let loader = Loader::new((0..8).collect(), IndexEcho::new(4, 1), 1, 6, 4)?;
    let mut buffers = loader.buffers();

    match loader.next(&mut buffers) {
        Err(DispenserError::ShapeMismatch {
            what,
            expected,
            actual,
            ..
        }) => {
            assert_eq!(what, "feature");
            assert_eq!(expected, 6);
            assert_eq!(actual, 4);
        }
        other => panic!("expected ShapeMismatch, got {:?}", other.map(|b| b.len())),
    }
    Ok(())
}

#[test]
fn test_invalid_configuration() {
    let transform = || IndexEcho::new(1, 1);
    assert!(matches!(
        Loader::new(vec![], transform(), 1, 1, 4),
        Err(DispenserError::Config { .. })
    ));
    assert!(matches!(
        Loader::new((0..4).collect(), transform(), 1, 1, 0),
        Err(DispenserError::Config { .. })
    ));
    assert!(matches!(
        Loader::new(vec![1, 2, 2], transform(), 1, 1, 1),
        Err(DispenserError::Config { .. })
    ));
}

// ============================================================================
// 4. Audio Clips
// ============================================================================

#[test]
fn test_loader_over_pcm_clips() -> Result<()> {
    let dir = TempDir::new()?;
    let tracks = vec![
        Track::new(1, "Folk"),
        Track::new(2, "Rock"),
        Track::new(3, "Folk"),
        Track::new(4, "Pop"),
        Track::new(5, "Rock"),
    ];
    for (i, track) in tracks.iter().enumerate() {
        let genre_dir = dir.path().join(&track.genre);
        fs::create_dir_all(&genre_dir)?;
        let sample = (i as i16 + 1) * 1024;
        fs::write(
            genre_dir.join(format!("{}.mp3", track.track_id)),
            sample.to_le_bytes(),
        )?;
    }

    let tracks = Arc::new(TrackTable::new(tracks));
    let labels = Arc::new(LabelTable::from_tracks(&tracks)?);
    let label_width = labels.width();
    let clip_samples = 4;
    let transform =
        ClipTransform::from_tracks(tracks.clone(), dir.path(), labels, PcmFileDecoder::new(clip_samples));

    let loader = Loader::new(tracks.indices(), transform, label_width, clip_samples, 2)?;
    let mut buffers = loader.buffers();

    let mut seen = HashSet::new();
    for _ in 0..3 {
        let batch = loader.next(&mut buffers)?;
        for (row, &index) in batch.ids().iter().enumerate() {
            let expected = ((index as f32) + 1.0) * 1024.0 / 32768.0;
            assert_eq!(batch.feature_row(row), &[expected, 0.0, 0.0, 0.0]);
            assert_eq!(batch.label_row(row).iter().sum::<f32>(), 1.0);
            seen.insert(index);
        }
    }
    assert_eq!(seen.len(), 5);
    Ok(())
}
