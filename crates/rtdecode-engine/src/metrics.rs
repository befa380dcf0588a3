// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use rtdecode_structures::{Label, VolumeIndex};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// One structured observation emitted by the streaming session.
#[derive(Debug, Clone)]
pub enum Observation {
    /// A volume was pulled from the watcher and preprocessed
    VolumeObserved {
        index: VolumeIndex,
        waited: Duration,
    },
    /// Initial training completed
    TrainingCompleted {
        sample_count: usize,
        elapsed: Duration,
    },
    /// A volume was classified against the live model
    VolumeClassified {
        index: VolumeIndex,
        predicted: Label,
        actual: Label,
        correct: bool,
        running_accuracy: f64,
        elapsed: Duration,
    },
    /// An incremental batch was absorbed into the model
    ModelUpdated {
        batch_size: usize,
        elapsed: Duration,
    },
    /// An incremental update was rejected; the previous model stays live
    ModelUpdateFailed { index: VolumeIndex, reason: String },
    /// The session reached its final configured index
    RunFinished { classified: usize, accuracy: f64 },
}

/// Timing/accuracy recording seam.
///
/// External reporting (plotting, dashboards, experiment logs) hooks into the
/// session here; the session itself never depends on what a sink does with
/// the observations.
pub trait MetricsSink {
    fn record(&mut self, observation: &Observation);
}

/// Sink that forwards observations to the `tracing` log stream.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        TracingSink
    }
}

impl MetricsSink for TracingSink {
    fn record(&mut self, observation: &Observation) {
        match observation {
            Observation::VolumeObserved { index, waited } => {
                info!("[SESSION] Volume {} observed after {:?}", index, waited);
            }
            Observation::TrainingCompleted {
                sample_count,
                elapsed,
            } => {
                info!(
                    "[SESSION] Trained on {} samples in {:?}",
                    sample_count, elapsed
                );
            }
            Observation::VolumeClassified {
                index,
                predicted,
                actual,
                correct,
                running_accuracy,
                elapsed,
            } => {
                info!(
                    "[SESSION] Volume {}: predicted {} actual {} ({}) accuracy {:.3} in {:?}",
                    index,
                    predicted,
                    actual,
                    if *correct { "correct" } else { "wrong" },
                    running_accuracy,
                    elapsed
                );
            }
            Observation::ModelUpdated {
                batch_size,
                elapsed,
            } => {
                info!(
                    "[SESSION] Model updated with batch of {} in {:?}",
                    batch_size, elapsed
                );
            }
            Observation::ModelUpdateFailed { index, reason } => {
                warn!(
                    "[SESSION] Model update failed at volume {}: {}",
                    index, reason
                );
            }
            Observation::RunFinished {
                classified,
                accuracy,
            } => {
                info!(
                    "[SESSION] Finished: {} classified, accuracy {:.3}",
                    classified, accuracy
                );
            }
        }
    }
}

/// Sink that keeps every observation in memory, for tests and offline
/// inspection.
///
/// Clones share the same buffer, so a handle kept outside the session can
/// read back what the session recorded.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    observations: Arc<Mutex<Vec<Observation>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink {
            observations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }

    pub fn update_count(&self) -> usize {
        self.observations
            .lock()
            .unwrap()
            .iter()
            .filter(|o| matches!(o, Observation::ModelUpdated { .. }))
            .count()
    }

    pub fn training_count(&self) -> usize {
        self.observations
            .lock()
            .unwrap()
            .iter()
            .filter(|o| matches!(o, Observation::TrainingCompleted { .. }))
            .count()
    }
}

impl MetricsSink for MemorySink {
    fn record(&mut self, observation: &Observation) {
        self.observations.lock().unwrap().push(observation.clone());
    }
}
