// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtdecode_structures::{FeatureVector, Label};

/// Scale of the seeded random weight initialization.
const INIT_WEIGHT_SCALE: f32 = 0.01;

/// Multinomial softmax-regression model state.
///
/// Weights are `n_classes x n_features`; training is per-sample gradient
/// descent on the cross-entropy loss, applied in deterministic batch order
/// so a fixed seed reproduces a run exactly.
#[derive(Debug, Clone)]
pub(crate) struct SoftmaxModel {
    classes: Vec<Label>,
    weights: Array2<f32>,
    bias: Array1<f32>,
}

impl SoftmaxModel {
    /// Creates an untrained model over a fixed class set with seeded random
    /// initialization. `classes` must be sorted and deduplicated.
    pub fn new_seeded(classes: Vec<Label>, feature_count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let class_count = classes.len();
        let weights = Array2::from_shape_fn((class_count, feature_count), |_| {
            rng.gen_range(-INIT_WEIGHT_SCALE..INIT_WEIGHT_SCALE)
        });
        let bias = Array1::zeros(class_count);
        SoftmaxModel {
            classes,
            weights,
            bias,
        }
    }

    pub fn classes(&self) -> &[Label] {
        &self.classes
    }

    pub fn feature_count(&self) -> usize {
        self.weights.ncols()
    }

    pub fn class_position(&self, label: Label) -> Option<usize> {
        self.classes.iter().position(|known| *known == label)
    }

    /// One gradient-descent pass over the batch, sample by sample in order.
    /// Callers have already validated shapes against this model.
    pub fn train_epoch(&mut self, features: &[FeatureVector], targets: &[usize], rate: f32) {
        for (vector, target) in features.iter().zip(targets) {
            let mut probabilities = self.probabilities(vector);
            probabilities[*target] -= 1.0;
            for class in 0..self.classes.len() {
                let gradient = probabilities[class];
                if gradient == 0.0 {
                    continue;
                }
                let mut row = self.weights.row_mut(class);
                row.scaled_add(-rate * gradient, vector.values());
                self.bias[class] -= rate * gradient;
            }
        }
    }

    /// Class probabilities for one feature vector (numerically stabilized
    /// softmax over the linear scores).
    pub fn probabilities(&self, vector: &FeatureVector) -> Array1<f32> {
        let mut scores = self.weights.dot(vector.values()) + &self.bias;
        let max_score = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        scores.mapv_inplace(|score| (score - max_score).exp());
        let total: f32 = scores.sum();
        scores.mapv_inplace(|score| score / total);
        scores
    }

    /// Highest-probability class; ties resolve to the lowest class position
    /// so prediction is a pure function of (model, vector).
    pub fn predict(&self, vector: &FeatureVector) -> Label {
        let probabilities = self.probabilities(vector);
        let mut best = 0;
        for (position, probability) in probabilities.iter().enumerate() {
            if *probability > probabilities[best] {
                best = position;
            }
        }
        self.classes[best]
    }

    /// False when any parameter went non-finite, e.g. after a diverging
    /// update. Used to reject a candidate model before committing it.
    pub fn is_finite(&self) -> bool {
        self.weights.iter().all(|w| w.is_finite()) && self.bias.iter().all(|b| b.is_finite())
    }
}

/// Sorted, deduplicated class set of a training batch.
pub(crate) fn class_set(labels: &[Label]) -> Vec<Label> {
    let mut classes: Vec<Label> = labels.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}
