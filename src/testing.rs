//! Test doubles for the classifier seam.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use ndarray::{Array1, ArrayViewD};

use crate::error::{ClassifyError, Result};
use crate::model::Classifier;

/// Returns the same scores for every input and records the shapes it saw.
pub struct FixedClassifier {
    scores: Vec<f32>,
    width: Option<usize>,
    input: Option<Vec<i64>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<usize>>>,
}

impl FixedClassifier {
    pub fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            width: None,
            input: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn declaring_width(mut self) -> Self {
        self.width = Some(self.scores.len());
        self
    }

    pub fn declaring_input(mut self, dims: Vec<i64>) -> Self {
        self.input = Some(dims);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen_shapes(&self) -> Vec<Vec<usize>> {
        self.seen.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Classifier for FixedClassifier {
    fn predict(&self, input: ArrayViewD<'_, f32>) -> Result<Array1<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .map_err(|_| ClassifyError::invalid_input("poisoned"))?
            .push(input.shape().to_vec());
        Ok(Array1::from_vec(self.scores.clone()))
    }

    fn output_width(&self) -> Option<usize> {
        self.width
    }

    fn input_dims(&self) -> Option<Vec<i64>> {
        self.input.clone()
    }
}
