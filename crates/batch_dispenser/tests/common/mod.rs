#![allow(dead_code)]

use batch_dispenser::{Example, Transform};

use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Features are the index repeated `feature_width` times; the label is a
/// one-hot of `index % label_width`. Lets tests recover the index from a row.
#[derive(Clone)]
pub struct IndexEcho {
    pub feature_width: usize,
    pub label_width: usize,
}

impl IndexEcho {
    pub fn new(feature_width: usize, label_width: usize) -> Self {
        Self {
            feature_width,
            label_width,
        }
    }
}

impl Transform<usize, Example> for IndexEcho {
    fn apply(&self, index: usize) -> Result<Example> {
        Ok(echo(index, self.feature_width, self.label_width))
    }
}

pub fn echo(index: usize, feature_width: usize, label_width: usize) -> Example {
    let mut label = vec![0.0; label_width];
    label[index % label_width] = 1.0;
    Example::new(vec![index as f32; feature_width], label)
}

/// `IndexEcho` that sleeps a little per index, varying with the index so
/// workers finish out of claim order.
#[derive(Clone)]
pub struct JitterTransform {
    pub max_delay_us: u64,
}

impl Transform<usize, Example> for JitterTransform {
    fn apply(&self, index: usize) -> Result<Example> {
        let delay = (index as u64 * 7919) % (self.max_delay_us + 1);
        thread::sleep(Duration::from_micros(delay));
        Ok(echo(index, 1, 1))
    }
}

/// Sleeps `delay` when asked for `slow_index`, echoes everything else.
#[derive(Clone)]
pub struct SlowIndex {
    pub slow_index: usize,
    pub delay: Duration,
}

impl Transform<usize, Example> for SlowIndex {
    fn apply(&self, index: usize) -> Result<Example> {
        if index == self.slow_index {
            thread::sleep(self.delay);
        }
        Ok(echo(index, 1, 1))
    }
}

/// Fails for every index in `failing`.
#[derive(Clone)]
pub struct FailingTransform {
    pub failing: Arc<HashSet<usize>>,
}

impl FailingTransform {
    pub fn new(failing: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing: Arc::new(failing.into_iter().collect()),
        }
    }
}

impl Transform<usize, Example> for FailingTransform {
    fn apply(&self, index: usize) -> Result<Example> {
        if self.failing.contains(&index) {
            return Err(anyhow!("Corrupt item {}", index));
        }
        Ok(echo(index, 1, 1))
    }
}

/// Counts calls; the first call sleeps for `first_delay`.
#[derive(Clone)]
pub struct StallFirst {
    pub calls: Arc<AtomicUsize>,
    pub first_delay: Duration,
}

impl StallFirst {
    pub fn new(first_delay: Duration) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            first_delay,
        }
    }
}

impl Transform<usize, Example> for StallFirst {
    fn apply(&self, index: usize) -> Result<Example> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            thread::sleep(self.first_delay);
        }
        Ok(echo(index, 1, 1))
    }
}

/// Recovers the dataset index encoded by `IndexEcho` in a feature row.
pub fn decoded_index(row: &[f32]) -> usize {
    row[0] as usize
}
