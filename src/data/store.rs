//! Shared, index-aligned sample store.
//!
//! The reader thread appends, the GUI thread snapshots. All three sequences
//! live behind one mutex and every append pushes to all of them inside the
//! same critical section, so no observer can ever see unequal lengths.

use crate::core::Sample;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Column-oriented copy of the store, ready for plotting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleSeries {
    /// Elapsed seconds since run start
    pub times: Vec<f64>,
    /// Temperatures in °C
    pub temperatures: Vec<f64>,
    /// Relative humidities in %
    pub humidities: Vec<f64>,
}

impl SampleSeries {
    /// Number of samples in the snapshot.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// True if the snapshot holds no samples.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// `[time, temperature]` pairs.
    pub fn temperature_points(&self) -> Vec<[f64; 2]> {
        zip_points(&self.times, &self.temperatures)
    }

    /// `[time, humidity]` pairs.
    pub fn humidity_points(&self) -> Vec<[f64; 2]> {
        zip_points(&self.times, &self.humidities)
    }

    /// Row-oriented view of the snapshot.
    pub fn samples(&self) -> Vec<Sample> {
        self.times
            .iter()
            .zip(&self.temperatures)
            .zip(&self.humidities)
            .map(|((&elapsed_seconds, &temperature), &humidity)| Sample {
                elapsed_seconds,
                temperature,
                humidity,
            })
            .collect()
    }

    fn push(&mut self, sample: Sample) {
        self.times.push(sample.elapsed_seconds);
        self.temperatures.push(sample.temperature);
        self.humidities.push(sample.humidity);
    }

    fn clear(&mut self) {
        self.times.clear();
        self.temperatures.clear();
        self.humidities.clear();
    }
}

fn zip_points(xs: &[f64], ys: &[f64]) -> Vec<[f64; 2]> {
    xs.iter().zip(ys).map(|(&x, &y)| [x, y]).collect()
}

/// Cheaply clonable handle to the samples of the current run.
#[derive(Clone, Debug, Default)]
pub struct SampleStore {
    inner: Arc<Mutex<SampleSeries>>,
}

impl SampleStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // Values are plain numbers, so a panic mid-append cannot leave them
    // half-written; recover the guard instead of propagating the poison.
    fn lock(&self) -> MutexGuard<'_, SampleSeries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends one sample to all three sequences atomically.
    pub fn push(&self, sample: Sample) {
        self.lock().push(sample);
    }

    /// Truncates all three sequences.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing has been stored since the last clear.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy-on-read snapshot of the current contents.
    pub fn snapshot(&self) -> SampleSeries {
        self.lock().clone()
    }
}
