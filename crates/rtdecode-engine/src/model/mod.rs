// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Pluggable model capability for the streaming session.
//!
//! The session never depends on concrete model internals, only on the
//! [`ModelAdapter`] contract: fit from labeled feature vectors, predict a
//! label, optionally absorb small incremental batches. Two adapters are
//! provided over the same multinomial softmax-regression model: a batch
//! variant that only ever refits from scratch and an incremental variant
//! whose `update` converges toward the repeated-refit decision boundary.

mod batch;
mod incremental;
mod softmax;

pub use batch::BatchSoftmaxAdapter;
pub use incremental::IncrementalSoftmaxAdapter;

use rtdecode_structures::{FeatureVector, Label, RtDecodeError, RtDecodeResult};

/// Capability contract over an opaque trainable model.
///
/// The model state is owned exclusively by the adapter and is only ever
/// touched from the session's single consumer thread. Exactly one model is
/// live at any time: absent before the first successful `fit`, valid
/// afterwards, and never visibly partially updated.
pub trait ModelAdapter {
    /// Short human-readable adapter name for logs and summaries.
    fn name(&self) -> &'static str;

    /// Discards any previous model and fits a fresh one.
    ///
    /// # Errors
    /// [`RtDecodeError::BadInput`] on an empty batch, mismatched
    /// feature/label counts, or inconsistent feature vector lengths.
    fn fit(&mut self, features: &[FeatureVector], labels: &[Label]) -> RtDecodeResult<()>;

    /// Absorbs a small batch into the existing model, replacing it only on
    /// success. Batches as small as one sample must be tolerated.
    ///
    /// # Errors
    /// [`RtDecodeError::ModelUpdate`] when the update cannot be applied
    /// (unsupported by the adapter, label outside the fitted class set,
    /// numerical failure). The previous model MUST remain valid and in use.
    fn update(&mut self, features: &[FeatureVector], labels: &[Label]) -> RtDecodeResult<()>;

    /// Predicts the label for one feature vector. Pure: never mutates the
    /// model, and repeated calls with the same model and input return the
    /// same label.
    ///
    /// # Errors
    /// [`RtDecodeError::NotReady`] before the first successful `fit`.
    fn predict(&self, features: &FeatureVector) -> RtDecodeResult<Label>;

    /// Whether this adapter implements `update`.
    fn supports_update(&self) -> bool;

    /// Whether a model is currently live.
    fn is_fitted(&self) -> bool;
}

/// Shared batch validation: non-empty, counts match, feature lengths agree.
/// Returns the feature length.
pub(crate) fn validate_batch(
    features: &[FeatureVector],
    labels: &[Label],
) -> RtDecodeResult<usize> {
    if features.is_empty() {
        return Err(RtDecodeError::BadInput(
            "training batch is empty".to_string(),
        ));
    }
    if features.len() != labels.len() {
        return Err(RtDecodeError::BadInput(format!(
            "{} feature vectors but {} labels",
            features.len(),
            labels.len()
        )));
    }
    let feature_len = features[0].len();
    if feature_len == 0 {
        return Err(RtDecodeError::BadInput(
            "feature vectors are empty".to_string(),
        ));
    }
    for (position, vector) in features.iter().enumerate() {
        if vector.len() != feature_len {
            return Err(RtDecodeError::BadInput(format!(
                "feature vector {} has length {} but the batch started with {}",
                position,
                vector.len(),
                feature_len
            )));
        }
    }
    Ok(feature_len)
}
