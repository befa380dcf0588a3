// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The core crate for rtdecode. Defines the data types shared by every layer
//! of the streaming classification pipeline: acquisition volumes, masks,
//! feature vectors, label codes, and the common error type.

mod descriptors;
mod error;
mod feature_vector;
mod volume;

pub mod codec;

pub use descriptors::{Label, VolumeIndex};
pub use error::{RtDecodeError, RtDecodeResult};
pub use feature_vector::FeatureVector;
pub use volume::{Volume, VolumeMask};
