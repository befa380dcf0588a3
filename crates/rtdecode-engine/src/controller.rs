// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The session state machine driving watcher, preprocessor and model.

use crate::metrics::{MetricsSink, Observation};
use crate::model::ModelAdapter;
use crate::preprocess::Preprocessor;
use rtdecode_io::ArrivalWatcher;
use rtdecode_structures::{
    FeatureVector, Label, RtDecodeError, RtDecodeResult, VolumeIndex, VolumeMask,
};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Phase of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Accumulating preprocessed volumes into the training buffer
    Collecting,
    /// Fitting the initial model from the full training buffer
    Training,
    /// Predicting each arriving volume against the live model
    Classifying,
    /// Absorbing the most recent batch into the model
    IncrementalUpdating,
    /// All configured volumes processed
    Finished,
    /// An unrecovered error stopped the session
    Aborted,
}

/// Run-constant session parameters.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Number of leading volumes collected before the initial training
    pub train_count: u32,
    /// Total number of volumes in the run
    pub total_count: u32,
    /// Fixed offset subtracted when aligning behavioral labels to the
    /// delayed acquired response, in index units
    pub label_shift: u32,
    /// Incremental re-fit cadence in volumes; 0 disables updating entirely
    pub incremental_batch: u32,
}

/// Final report of a completed session.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub classified: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub training_elapsed: Duration,
    pub updates_applied: usize,
    pub updates_failed: usize,
}

/// Drives one streaming classification session.
///
/// Pulls volumes in strictly increasing index order from the injected
/// watcher, preprocesses them, accumulates the training buffer, fits the
/// model once the threshold is reached, classifies every subsequent volume,
/// and optionally re-fits every `incremental_batch` volumes. All
/// collaborators are injected and owned by the controller for exactly one
/// run; the watcher is released on every exit path, success or failure.
pub struct StreamingController {
    settings: SessionSettings,
    preprocessor: Preprocessor,
    labels: Vec<Label>,
    watcher: Box<dyn ArrivalWatcher>,
    adapter: Box<dyn ModelAdapter>,
    sink: Box<dyn MetricsSink>,
    state: RunState,
}

impl StreamingController {
    /// Validates the configuration and assembles a controller.
    ///
    /// # Errors
    /// [`RtDecodeError::BadInput`] when counts are inconsistent, the label
    /// sequence is too short for the configured run, or incremental updating
    /// is requested with an adapter that cannot update.
    pub fn new(
        settings: SessionSettings,
        mask: VolumeMask,
        labels: Vec<Label>,
        watcher: Box<dyn ArrivalWatcher>,
        adapter: Box<dyn ModelAdapter>,
        sink: Box<dyn MetricsSink>,
    ) -> RtDecodeResult<Self> {
        if settings.train_count == 0 {
            return Err(RtDecodeError::BadInput(
                "training count must be at least 1".to_string(),
            ));
        }
        if settings.train_count >= settings.total_count {
            return Err(RtDecodeError::BadInput(format!(
                "training count {} leaves no volumes to classify out of {}",
                settings.train_count, settings.total_count
            )));
        }
        if settings.label_shift > settings.train_count {
            return Err(RtDecodeError::BadInput(format!(
                "label shift {} exceeds training count {}",
                settings.label_shift, settings.train_count
            )));
        }
        // Every classified index must have a shift-aligned ground-truth label
        let required_labels = (settings.total_count - settings.label_shift) as usize;
        if labels.len() < required_labels {
            return Err(RtDecodeError::BadInput(format!(
                "label sequence has {} entries but the run needs {}",
                labels.len(),
                required_labels
            )));
        }
        if settings.incremental_batch > 0 && !adapter.supports_update() {
            return Err(RtDecodeError::BadInput(format!(
                "incremental batch {} configured but adapter '{}' cannot update",
                settings.incremental_batch,
                adapter.name()
            )));
        }

        Ok(StreamingController {
            settings,
            preprocessor: Preprocessor::new(mask),
            labels,
            watcher,
            adapter,
            sink,
            state: RunState::Collecting,
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Runs the session to completion.
    ///
    /// The watcher is stopped before this method returns on every path,
    /// including errors: a leaked producer keeps delivering events to a
    /// dead consumer.
    pub fn run(mut self) -> RtDecodeResult<RunSummary> {
        info!(
            "[SESSION] Starting: {} volumes, training at {}, shift {}, incremental batch {}, adapter '{}'",
            self.settings.total_count,
            self.settings.train_count,
            self.settings.label_shift,
            self.settings.incremental_batch,
            self.adapter.name()
        );

        let outcome = self.run_inner();
        self.watcher.stop();

        match outcome {
            Ok(summary) => {
                self.state = RunState::Finished;
                self.sink.record(&Observation::RunFinished {
                    classified: summary.classified,
                    accuracy: summary.accuracy,
                });
                Ok(summary)
            }
            Err(e) => {
                self.state = RunState::Aborted;
                error!("[SESSION] Aborted: {}", e);
                Err(e)
            }
        }
    }

    fn run_inner(&mut self) -> RtDecodeResult<RunSummary> {
        let mut training_buffer: BTreeMap<VolumeIndex, FeatureVector> = BTreeMap::new();
        let mut recent_pairs: Vec<(FeatureVector, Label)> = Vec::new();
        let mut training_elapsed = Duration::ZERO;
        let mut classified = 0usize;
        let mut correct = 0usize;
        let mut updates_applied = 0usize;
        let mut updates_failed = 0usize;

        for raw_index in 0..self.settings.total_count {
            let index = VolumeIndex::new(raw_index);
            let step_started = Instant::now();

            let volume = self.watcher.next_volume(index)?;
            let features = self.preprocessor.transform(&volume)?;
            self.sink.record(&Observation::VolumeObserved {
                index,
                waited: step_started.elapsed(),
            });

            if raw_index < self.settings.train_count {
                self.state = RunState::Collecting;
                training_buffer.insert(index, features);
                continue;
            }

            // The training transition fires exactly once, on the arrival of
            // the first post-threshold volume; that volume is then the first
            // one classified.
            if raw_index == self.settings.train_count {
                self.state = RunState::Training;
                training_elapsed = self.train_initial_model(&mut training_buffer)?;
                self.state = RunState::Classifying;
            }

            let actual = self.aligned_label(index)?;
            let predict_started = Instant::now();
            let predicted = self.adapter.predict(&features)?;
            let was_correct = predicted == actual;
            classified += 1;
            if was_correct {
                correct += 1;
            }
            self.sink.record(&Observation::VolumeClassified {
                index,
                predicted,
                actual,
                correct: was_correct,
                running_accuracy: correct as f64 / classified as f64,
                elapsed: predict_started.elapsed(),
            });

            // Evaluation feedback reaches the model only through the
            // explicit incremental path below, strictly after the boundary
            // volume's prediction was made against the pre-update model.
            if self.settings.incremental_batch > 0 {
                recent_pairs.push((features, actual));
                if recent_pairs.len() == self.settings.incremental_batch as usize {
                    match self.apply_incremental_update(&recent_pairs, index) {
                        Ok(elapsed) => {
                            updates_applied += 1;
                            self.sink.record(&Observation::ModelUpdated {
                                batch_size: recent_pairs.len(),
                                elapsed,
                            });
                        }
                        Err(RtDecodeError::ModelUpdate(reason)) => {
                            // The previous model stays live; the session
                            // keeps classifying on it.
                            updates_failed += 1;
                            warn!(
                                "[SESSION] Update at volume {} rejected: {}",
                                index, reason
                            );
                            self.sink.record(&Observation::ModelUpdateFailed {
                                index,
                                reason,
                            });
                        }
                        Err(fatal) => return Err(fatal),
                    }
                    recent_pairs.clear();
                }
            }
        }

        let accuracy = if classified > 0 {
            correct as f64 / classified as f64
        } else {
            0.0
        };
        Ok(RunSummary {
            classified,
            correct,
            accuracy,
            training_elapsed,
            updates_applied,
            updates_failed,
        })
    }

    /// Builds shift-aligned (feature, label) pairs from the consumed
    /// training buffer and fits the initial model.
    fn train_initial_model(
        &mut self,
        training_buffer: &mut BTreeMap<VolumeIndex, FeatureVector>,
    ) -> RtDecodeResult<Duration> {
        let buffer = std::mem::take(training_buffer);
        let mut features = Vec::with_capacity(buffer.len());
        let mut labels = Vec::with_capacity(buffer.len());
        for (index, vector) in buffer {
            // Pairs whose shifted index would be negative are dropped
            match index.shifted_back(self.settings.label_shift) {
                Some(label_index) => {
                    features.push(vector);
                    labels.push(self.labels[*label_index as usize]);
                }
                None => debug!(
                    "[SESSION] Dropping volume {} from training, shift precedes the label sequence",
                    index
                ),
            }
        }

        let fit_started = Instant::now();
        self.adapter.fit(&features, &labels)?;
        let elapsed = fit_started.elapsed();
        self.sink.record(&Observation::TrainingCompleted {
            sample_count: features.len(),
            elapsed,
        });
        Ok(elapsed)
    }

    fn apply_incremental_update(
        &mut self,
        pairs: &[(FeatureVector, Label)],
        index: VolumeIndex,
    ) -> RtDecodeResult<Duration> {
        self.state = RunState::IncrementalUpdating;
        let features: Vec<FeatureVector> = pairs.iter().map(|(f, _)| f.clone()).collect();
        let labels: Vec<Label> = pairs.iter().map(|(_, l)| *l).collect();
        debug!(
            "[SESSION] Applying incremental update of {} pairs at volume {}",
            pairs.len(),
            index
        );
        let update_started = Instant::now();
        let result = self.adapter.update(&features, &labels);
        self.state = RunState::Classifying;
        result.map(|()| update_started.elapsed())
    }

    /// Ground-truth label for `index` after the hemodynamic shift.
    fn aligned_label(&self, index: VolumeIndex) -> RtDecodeResult<Label> {
        let label_index = index
            .shifted_back(self.settings.label_shift)
            .ok_or_else(|| {
                RtDecodeError::BadInput(format!(
                    "volume {} has no shift-aligned label",
                    index
                ))
            })?;
        Ok(self.labels[*label_index as usize])
    }
}
