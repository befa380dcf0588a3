// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Acquisition volumes and the run-constant voxel mask.

use crate::{RtDecodeError, VolumeIndex};
use ndarray::Array3;

/// A single acquisition time point: a 3D array of voxel intensities.
///
/// Immutable once read. Each volume is read from disk exactly once and is
/// identified by its [`VolumeIndex`] within the run.
#[derive(Debug, Clone)]
pub struct Volume {
    index: VolumeIndex,
    data: Array3<f32>,
}

impl Volume {
    pub fn new(index: VolumeIndex, data: Array3<f32>) -> Self {
        Volume { index, data }
    }

    pub fn index(&self) -> VolumeIndex {
        self.index
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Spatial dimensions as (x, y, z).
    pub fn shape(&self) -> (usize, usize, usize) {
        let s = self.data.shape();
        (s[0], s[1], s[2])
    }
}

/// Boolean voxel-selection mask, constant for the duration of one run.
///
/// Shared read-only across all volumes; defines which spatial elements are
/// retained by preprocessing. The count of selected voxels fixes the feature
/// vector length for the whole run.
#[derive(Debug, Clone)]
pub struct VolumeMask {
    data: Array3<bool>,
    voxel_count: usize,
}

impl VolumeMask {
    pub fn new(data: Array3<bool>) -> Result<Self, RtDecodeError> {
        let voxel_count = data.iter().filter(|selected| **selected).count();
        if voxel_count == 0 {
            return Err(RtDecodeError::BadInput(
                "mask selects zero voxels".to_string(),
            ));
        }
        Ok(VolumeMask { data, voxel_count })
    }

    /// Number of `true` entries, i.e. the feature vector length.
    pub fn voxel_count(&self) -> usize {
        self.voxel_count
    }

    pub fn data(&self) -> &Array3<bool> {
        &self.data
    }

    /// Spatial dimensions as (x, y, z).
    pub fn shape(&self) -> (usize, usize, usize) {
        let s = self.data.shape();
        (s[0], s[1], s[2])
    }

    /// Whether `volume` has the spatial dimensions this mask expects.
    pub fn matches(&self, volume: &Volume) -> bool {
        self.shape() == volume.shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_mask_voxel_count() {
        let mut raw = Array3::from_elem((2, 2, 2), false);
        raw[[0, 0, 0]] = true;
        raw[[1, 1, 1]] = true;
        let mask = VolumeMask::new(raw).unwrap();
        assert_eq!(mask.voxel_count(), 2);
        assert_eq!(mask.shape(), (2, 2, 2));
    }

    #[test]
    fn test_empty_mask_rejected() {
        let raw = Array3::from_elem((2, 2, 2), false);
        assert!(VolumeMask::new(raw).is_err());
    }

    #[test]
    fn test_mask_volume_shape_match() {
        let mask = VolumeMask::new(Array3::from_elem((2, 3, 4), true)).unwrap();
        let volume = Volume::new(0.into(), Array3::zeros((2, 3, 4)));
        let wrong = Volume::new(1.into(), Array3::zeros((4, 3, 2)));
        assert!(mask.matches(&volume));
        assert!(!mask.matches(&wrong));
    }
}
