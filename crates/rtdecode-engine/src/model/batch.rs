// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::model::softmax::{class_set, SoftmaxModel};
use crate::model::{validate_batch, ModelAdapter};
use rtdecode_structures::{FeatureVector, Label, RtDecodeError, RtDecodeResult};
use tracing::info;

/// Adapter that only ever refits from scratch.
///
/// In a streaming session this is the "train once" mode: `fit` is called a
/// single time when the training buffer reaches its threshold, and the
/// model never changes afterwards.
pub struct BatchSoftmaxAdapter {
    model: Option<SoftmaxModel>,
    learning_rate: f32,
    fit_epochs: u32,
    seed: u64,
}

impl BatchSoftmaxAdapter {
    pub const DEFAULT_LEARNING_RATE: f32 = 0.05;
    pub const DEFAULT_FIT_EPOCHS: u32 = 200;

    pub fn new(seed: u64) -> Self {
        BatchSoftmaxAdapter {
            model: None,
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            fit_epochs: Self::DEFAULT_FIT_EPOCHS,
            seed,
        }
    }

    pub fn with_training_parameters(mut self, learning_rate: f32, fit_epochs: u32) -> Self {
        self.learning_rate = learning_rate;
        self.fit_epochs = fit_epochs;
        self
    }
}

impl ModelAdapter for BatchSoftmaxAdapter {
    fn name(&self) -> &'static str {
        "batch-softmax"
    }

    fn fit(&mut self, features: &[FeatureVector], labels: &[Label]) -> RtDecodeResult<()> {
        let feature_len = validate_batch(features, labels)?;
        let classes = class_set(labels);
        let mut model = SoftmaxModel::new_seeded(classes, feature_len, self.seed);
        let targets: Vec<usize> = labels
            .iter()
            .map(|label| {
                model
                    .class_position(*label)
                    .expect("class set was built from these labels")
            })
            .collect();

        for _ in 0..self.fit_epochs {
            model.train_epoch(features, &targets, self.learning_rate);
        }

        info!(
            "[MODEL] Fit {} on {} samples, {} classes, {} features",
            self.name(),
            features.len(),
            model.classes().len(),
            feature_len
        );
        // Any previous model is discarded only now, after a successful fit
        self.model = Some(model);
        Ok(())
    }

    fn update(&mut self, _features: &[FeatureVector], _labels: &[Label]) -> RtDecodeResult<()> {
        Err(RtDecodeError::ModelUpdate(
            "batch adapter does not support incremental updates".to_string(),
        ))
    }

    fn predict(&self, features: &FeatureVector) -> RtDecodeResult<Label> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| RtDecodeError::NotReady("predict called before fit".to_string()))?;
        if features.len() != model.feature_count() {
            return Err(RtDecodeError::BadInput(format!(
                "feature vector has length {} but the model expects {}",
                features.len(),
                model.feature_count()
            )));
        }
        Ok(model.predict(features))
    }

    fn supports_update(&self) -> bool {
        false
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable_batch() -> (Vec<FeatureVector>, Vec<Label>) {
        let features = vec![
            FeatureVector::from(vec![1.0, 1.0]),
            FeatureVector::from(vec![1.2, 0.8]),
            FeatureVector::from(vec![-1.0, -1.2]),
            FeatureVector::from(vec![-0.8, -1.0]),
        ];
        let labels = vec![Label::new(1), Label::new(1), Label::new(2), Label::new(2)];
        (features, labels)
    }

    #[test]
    fn test_predict_before_fit_is_not_ready() {
        let adapter = BatchSoftmaxAdapter::new(0);
        assert!(!adapter.is_fitted());
        assert!(matches!(
            adapter.predict(&FeatureVector::from(vec![0.0])),
            Err(RtDecodeError::NotReady(_))
        ));
    }

    #[test]
    fn test_fit_then_predict() {
        let (features, labels) = separable_batch();
        let mut adapter = BatchSoftmaxAdapter::new(3);
        adapter.fit(&features, &labels).unwrap();
        assert!(adapter.is_fitted());
        assert_eq!(
            adapter.predict(&FeatureVector::from(vec![1.1, 0.9])).unwrap(),
            Label::new(1)
        );
    }

    #[test]
    fn test_predict_is_idempotent() {
        let (features, labels) = separable_batch();
        let mut adapter = BatchSoftmaxAdapter::new(3);
        adapter.fit(&features, &labels).unwrap();

        let probe = FeatureVector::from(vec![0.3, -0.1]);
        let first = adapter.predict(&probe).unwrap();
        for _ in 0..10 {
            assert_eq!(adapter.predict(&probe).unwrap(), first);
        }
    }

    #[test]
    fn test_mismatched_counts_are_bad_input() {
        let (features, mut labels) = separable_batch();
        labels.pop();
        let mut adapter = BatchSoftmaxAdapter::new(0);
        assert!(matches!(
            adapter.fit(&features, &labels),
            Err(RtDecodeError::BadInput(_))
        ));
    }

    #[test]
    fn test_empty_batch_is_bad_input() {
        let mut adapter = BatchSoftmaxAdapter::new(0);
        assert!(matches!(
            adapter.fit(&[], &[]),
            Err(RtDecodeError::BadInput(_))
        ));
    }

    #[test]
    fn test_update_is_rejected() {
        let (features, labels) = separable_batch();
        let mut adapter = BatchSoftmaxAdapter::new(0);
        adapter.fit(&features, &labels).unwrap();
        assert!(!adapter.supports_update());
        assert!(matches!(
            adapter.update(&features, &labels),
            Err(RtDecodeError::ModelUpdate(_))
        ));
        // The fitted model is untouched by the rejected update
        assert!(adapter.is_fitted());
    }

    #[test]
    fn test_wrong_feature_length_is_bad_input() {
        let (features, labels) = separable_batch();
        let mut adapter = BatchSoftmaxAdapter::new(0);
        adapter.fit(&features, &labels).unwrap();
        assert!(matches!(
            adapter.predict(&FeatureVector::from(vec![1.0, 2.0, 3.0])),
            Err(RtDecodeError::BadInput(_))
        ));
    }
}
