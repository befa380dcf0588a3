// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use ndarray::Array1;
use std::ops::Deref;

/// Flat, analysis-ready representation of one volume.
///
/// Derived deterministically from a (volume, mask) pair; its length equals
/// the mask's selected voxel count and never changes across a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Array1<f32>);

impl FeatureVector {
    pub fn new(values: Array1<f32>) -> Self {
        FeatureVector(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &Array1<f32> {
        &self.0
    }
}

impl Deref for FeatureVector {
    type Target = Array1<f32>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<f32>> for FeatureVector {
    fn from(values: Vec<f32>) -> Self {
        FeatureVector(Array1::from_vec(values))
    }
}
