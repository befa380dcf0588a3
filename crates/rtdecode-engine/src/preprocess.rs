// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use rtdecode_structures::{FeatureVector, RtDecodeError, RtDecodeResult, Volume, VolumeMask};
use tracing::trace;

/// Threshold under which the per-volume standard deviation is treated as
/// zero and scaling is skipped.
const STD_EPSILON: f64 = 1e-12;

/// Turns a raw volume into a flat, analysis-ready feature vector.
///
/// Selects the mask's voxels in mask iteration order, then z-scores across
/// the selected elements of that single volume only. Statistics are never
/// computed across time: at arrival time no future volumes exist, and
/// recomputing over history would invalidate predictions already emitted.
///
/// The output length equals the mask's selected voxel count for every
/// volume of the run.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    mask: VolumeMask,
}

impl Preprocessor {
    pub fn new(mask: VolumeMask) -> Self {
        Preprocessor { mask }
    }

    pub fn mask(&self) -> &VolumeMask {
        &self.mask
    }

    /// Length of every feature vector this preprocessor emits.
    pub fn feature_count(&self) -> usize {
        self.mask.voxel_count()
    }

    /// Masks, flattens and z-scores one volume.
    ///
    /// # Errors
    /// [`RtDecodeError::BadInput`] when the volume's spatial dimensions do
    /// not match the mask.
    ///
    /// # Degenerate volumes
    /// When the selected voxels have (near-)zero standard deviation, e.g. a
    /// single-voxel mask or a constant volume, the centered values are
    /// emitted unscaled. They are all zero in that case; NaN is never
    /// produced.
    pub fn transform(&self, volume: &Volume) -> RtDecodeResult<FeatureVector> {
        if !self.mask.matches(volume) {
            return Err(RtDecodeError::BadInput(format!(
                "volume {} has shape {:?} but the mask expects {:?}",
                volume.index(),
                volume.shape(),
                self.mask.shape()
            )));
        }

        let mut selected: Vec<f64> = Vec::with_capacity(self.mask.voxel_count());
        for (keep, value) in self.mask.data().iter().zip(volume.data().iter()) {
            if *keep {
                selected.push(f64::from(*value));
            }
        }

        let count = selected.len() as f64;
        let mean = selected.iter().sum::<f64>() / count;
        // Sample standard deviation, so the emitted vector's own sample std is 1
        let std = if selected.len() > 1 {
            (selected
                .iter()
                .map(|value| (value - mean).powi(2))
                .sum::<f64>()
                / (count - 1.0))
                .sqrt()
        } else {
            0.0
        };

        let normalized: Vec<f32> = if std > STD_EPSILON {
            selected
                .iter()
                .map(|value| ((value - mean) / std) as f32)
                .collect()
        } else {
            trace!(
                "[PREPROCESS] Volume {} has zero variance over the mask, emitting centered values",
                volume.index()
            );
            selected.iter().map(|value| (value - mean) as f32).collect()
        };

        Ok(FeatureVector::from(normalized))
    }
}
