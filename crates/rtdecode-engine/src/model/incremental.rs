// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::model::softmax::{class_set, SoftmaxModel};
use crate::model::{validate_batch, ModelAdapter};
use rtdecode_structures::{FeatureVector, Label, RtDecodeError, RtDecodeResult};
use tracing::{debug, info};

/// Adapter that keeps re-fitting the live model with small batches.
///
/// The first `fit` establishes the class set and the initial decision
/// boundary; each `update` runs SGD passes over the new batch starting from
/// the current parameters, which converges toward the boundary a full refit
/// over the accumulated data would reach. Updates train on a working copy
/// and commit only on success, so a failed update never corrupts or
/// discards the live model.
pub struct IncrementalSoftmaxAdapter {
    model: Option<SoftmaxModel>,
    learning_rate: f32,
    fit_epochs: u32,
    update_epochs: u32,
    seed: u64,
}

impl IncrementalSoftmaxAdapter {
    pub const DEFAULT_LEARNING_RATE: f32 = 0.05;
    pub const DEFAULT_FIT_EPOCHS: u32 = 200;
    pub const DEFAULT_UPDATE_EPOCHS: u32 = 10;

    pub fn new(seed: u64) -> Self {
        IncrementalSoftmaxAdapter {
            model: None,
            learning_rate: Self::DEFAULT_LEARNING_RATE,
            fit_epochs: Self::DEFAULT_FIT_EPOCHS,
            update_epochs: Self::DEFAULT_UPDATE_EPOCHS,
            seed,
        }
    }

    pub fn with_training_parameters(
        mut self,
        learning_rate: f32,
        fit_epochs: u32,
        update_epochs: u32,
    ) -> Self {
        self.learning_rate = learning_rate;
        self.fit_epochs = fit_epochs;
        self.update_epochs = update_epochs;
        self
    }
}

impl ModelAdapter for IncrementalSoftmaxAdapter {
    fn name(&self) -> &'static str {
        "incremental-softmax"
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
        self.model = Some(model);
        Ok(())
    }

    fn update(&mut self, features: &[FeatureVector], labels: &[Label]) -> RtDecodeResult<()> {
        let live = self
            .model
            .as_ref()
            .ok_or_else(|| RtDecodeError::NotReady("update called before fit".to_string()))?;

        let feature_len = validate_batch(features, labels)?;
        if feature_len != live.feature_count() {
            return Err(RtDecodeError::BadInput(format!(
                "update batch has {} features but the model expects {}",
                feature_len,
                live.feature_count()
            )));
        }

        // Labels outside the fitted class set cannot be absorbed; reject
        // before touching any state.
        let mut targets = Vec::with_capacity(labels.len());
        for label in labels {
            match live.class_position(*label) {
                Some(position) => targets.push(position),
                None => {
                    return Err(RtDecodeError::ModelUpdate(format!(
                        "label {} is outside the fitted class set",
                        label
                    )))
                }
            }
        }

        let mut candidate = live.clone();
        for _ in 0..self.update_epochs {
            candidate.train_epoch(features, &targets, self.learning_rate);
        }
        if !candidate.is_finite() {
            return Err(RtDecodeError::ModelUpdate(
                "update produced non-finite parameters".to_string(),
            ));
        }

        debug!(
            "[MODEL] Updated {} with a batch of {}",
            self.name(),
            features.len()
        );
        self.model = Some(candidate);
        Ok(())
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
        true
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_sample(side: f32, jitter: f32) -> FeatureVector {
        FeatureVector::from(vec![side + jitter, side - jitter])
    }

    fn initial_batch() -> (Vec<FeatureVector>, Vec<Label>) {
        let features = vec![
            cluster_sample(1.0, 0.1),
            cluster_sample(1.0, -0.2),
            cluster_sample(-1.0, 0.1),
            cluster_sample(-1.0, -0.1),
        ];
        let labels = vec![Label::new(1), Label::new(1), Label::new(2), Label::new(2)];
        (features, labels)
    }

    #[test]
    fn test_update_with_single_sample_batch() {
        let (features, labels) = initial_batch();
        let mut adapter = IncrementalSoftmaxAdapter::new(9);
        adapter.fit(&features, &labels).unwrap();

        adapter
            .update(&[cluster_sample(1.0, 0.05)], &[Label::new(1)])
            .unwrap();
        assert_eq!(
            adapter.predict(&cluster_sample(1.0, 0.0)).unwrap(),
            Label::new(1)
        );
    }

    #[test]
    fn test_update_before_fit_is_not_ready() {
        let mut adapter = IncrementalSoftmaxAdapter::new(9);
        assert!(matches!(
            adapter.update(&[cluster_sample(1.0, 0.0)], &[Label::new(1)]),
            Err(RtDecodeError::NotReady(_))
        ));
    }

    #[test]
    fn test_unknown_label_rejected_and_model_survives() {
        let (features, labels) = initial_batch();
        let mut adapter = IncrementalSoftmaxAdapter::new(9);
        adapter.fit(&features, &labels).unwrap();

        let probe = cluster_sample(1.0, 0.0);
        let before = adapter.predict(&probe).unwrap();

        let result = adapter.update(&[cluster_sample(0.0, 0.0)], &[Label::new(99)]);
        assert!(matches!(result, Err(RtDecodeError::ModelUpdate(_))));

        // The previous model remains live and unchanged
        assert!(adapter.is_fitted());
        assert_eq!(adapter.predict(&probe).unwrap(), before);
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let (features, labels) = initial_batch();
        let probes: Vec<FeatureVector> = (0..8)
            .map(|i| cluster_sample(if i % 2 == 0 { 1.0 } else { -1.0 }, i as f32 * 0.03))
            .collect();

        let run = |seed: u64| -> Vec<Label> {
            let mut adapter = IncrementalSoftmaxAdapter::new(seed);
            adapter.fit(&features, &labels).unwrap();
            for chunk in probes.chunks(2) {
                let chunk_labels: Vec<Label> = chunk
                    .iter()
                    .map(|v| if v[0] > 0.0 { Label::new(1) } else { Label::new(2) })
                    .collect();
                adapter.update(chunk, &chunk_labels).unwrap();
            }
            probes.iter().map(|p| adapter.predict(p).unwrap()).collect()
        };

        assert_eq!(run(1234), run(1234));
    }

    #[test]
    fn test_updates_converge_toward_refit_boundary() {
        // Feed the same data incrementally and as one refit; both models
        // must classify well-separated probes identically.
        let (features, labels) = initial_batch();

        let mut incremental = IncrementalSoftmaxAdapter::new(5);
        incremental.fit(&features, &labels).unwrap();
        for _ in 0..20 {
            incremental.update(&features, &labels).unwrap();
        }

        let mut refit = IncrementalSoftmaxAdapter::new(5);
        refit.fit(&features, &labels).unwrap();

        for probe in [cluster_sample(1.0, 0.0), cluster_sample(-1.0, 0.0)] {
            assert_eq!(
                incremental.predict(&probe).unwrap(),
                refit.predict(&probe).unwrap()
            );
        }
    }
}
