//! State-machine tests for the streaming session: training transition,
//! incremental update ordering, and teardown guarantees.

use ndarray::Array3;
use rtdecode_engine::{
    BatchSoftmaxAdapter, MemorySink, ModelAdapter, Observation, RunState, SessionSettings,
    StreamingController,
};
use rtdecode_structures::{
    FeatureVector, Label, RtDecodeError, RtDecodeResult, Volume, VolumeIndex, VolumeMask,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

//region Test doubles

/// Watcher serving pre-baked volumes, recording whether it was stopped.
struct ScriptedWatcher {
    volumes: Vec<Array3<f32>>,
    stopped: Arc<AtomicBool>,
    fail_at: Option<u32>,
}

impl ScriptedWatcher {
    fn new(volumes: Vec<Array3<f32>>, stopped: Arc<AtomicBool>) -> Self {
        ScriptedWatcher {
            volumes,
            stopped,
            fail_at: None,
        }
    }

    fn failing_at(mut self, index: u32) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl rtdecode_io::ArrivalWatcher for ScriptedWatcher {
    fn next_volume(&mut self, expected: VolumeIndex) -> RtDecodeResult<Volume> {
        if self.fail_at == Some(*expected) {
            return Err(RtDecodeError::PartialRead(format!(
                "volume {} never stabilized",
                expected
            )));
        }
        let data = self
            .volumes
            .get(*expected as usize)
            .cloned()
            .ok_or_else(|| RtDecodeError::BadInput(format!("no volume {}", expected)))?;
        Ok(Volume::new(expected, data))
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::Release);
    }
}

/// Adapter whose predictions expose the model generation: each update bumps
/// the generation, so tests can verify which model a prediction used.
struct GenerationAdapter {
    fitted: bool,
    generation: i32,
}

impl GenerationAdapter {
    fn new() -> Self {
        GenerationAdapter {
            fitted: false,
            generation: 0,
        }
    }
}

impl ModelAdapter for GenerationAdapter {
    fn name(&self) -> &'static str {
        "generation-probe"
    }

    fn fit(&mut self, features: &[FeatureVector], labels: &[Label]) -> RtDecodeResult<()> {
        assert_eq!(features.len(), labels.len());
        self.fitted = true;
        Ok(())
    }

    fn update(&mut self, _features: &[FeatureVector], _labels: &[Label]) -> RtDecodeResult<()> {
        self.generation += 1;
        Ok(())
    }

    fn predict(&self, _features: &FeatureVector) -> RtDecodeResult<Label> {
        if !self.fitted {
            return Err(RtDecodeError::NotReady("predict before fit".to_string()));
        }
        Ok(Label::new(self.generation))
    }

    fn supports_update(&self) -> bool {
        true
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

fn single_voxel_mask() -> VolumeMask {
    let mut raw = Array3::from_elem((1, 1, 2), false);
    raw[[0, 0, 0]] = true;
    VolumeMask::new(raw).unwrap()
}

fn flat_volumes(count: u32) -> Vec<Array3<f32>> {
    (0..count)
        .map(|i| Array3::from_elem((1, 1, 2), i as f32))
        .collect()
}

fn alternating_labels(count: u32) -> Vec<Label> {
    (0..count)
        .map(|i| Label::new(if i % 2 == 0 { 1 } else { 2 }))
        .collect()
}

fn settings(train: u32, total: u32, shift: u32, batch: u32) -> SessionSettings {
    SessionSettings {
        train_count: train,
        total_count: total,
        label_shift: shift,
        incremental_batch: batch,
    }
}

//endregion

#[test]
fn test_scenario_single_voxel_run() {
    // Single-voxel mask, threshold 5, 10 volumes with alternating labels,
    // shift 0: trains at index 5 on pairs (0..4), classifies 5..9.
    let stopped = Arc::new(AtomicBool::new(false));
    let sink = MemorySink::new();
    let controller = StreamingController::new(
        settings(5, 10, 0, 0),
        single_voxel_mask(),
        alternating_labels(10),
        Box::new(ScriptedWatcher::new(flat_volumes(10), stopped.clone())),
        Box::new(BatchSoftmaxAdapter::new(17)),
        Box::new(sink.clone()),
    )
    .unwrap();

    let summary = controller.run().unwrap();
    assert_eq!(summary.classified, 5);
    assert!((0.0..=1.0).contains(&summary.accuracy));
    assert_eq!(sink.training_count(), 1);
    assert!(stopped.load(Ordering::Acquire), "watcher must be released");

    // Training consumed exactly the five buffered pairs
    let trained_on: Vec<usize> = sink
        .observations()
        .iter()
        .filter_map(|o| match o {
            Observation::TrainingCompleted { sample_count, .. } => Some(*sample_count),
            _ => None,
        })
        .collect();
    assert_eq!(trained_on, vec![5]);
}

#[test]
fn test_training_fires_exactly_once_at_threshold() {
    let stopped = Arc::new(AtomicBool::new(false));
    let sink = MemorySink::new();
    let controller = StreamingController::new(
        settings(3, 8, 0, 0),
        single_voxel_mask(),
        alternating_labels(8),
        Box::new(ScriptedWatcher::new(flat_volumes(8), stopped)),
        Box::new(BatchSoftmaxAdapter::new(0)),
        Box::new(sink.clone()),
    )
    .unwrap();

    controller.run().unwrap();
    assert_eq!(sink.training_count(), 1);

    // The first classification observation is the threshold index itself
    let first_classified = sink.observations().iter().find_map(|o| match o {
        Observation::VolumeClassified { index, .. } => Some(*index),
        _ => None,
    });
    assert_eq!(first_classified, Some(VolumeIndex::new(3)));
}

#[test]
fn test_label_shift_alignment() {
    // With shift 2, volume i is evaluated against label i-2. The
    // generation adapter always predicts 0, so accuracy counts how often
    // label[i-2] == 0; labels are crafted to make that split observable.
    let stopped = Arc::new(AtomicBool::new(false));
    let sink = MemorySink::new();
    let labels: Vec<Label> = [0, 0, 0, 1, 0, 1]
        .iter()
        .map(|code| Label::new(*code))
        .collect();
    let controller = StreamingController::new(
        settings(4, 8, 2, 0),
        single_voxel_mask(),
        labels,
        Box::new(ScriptedWatcher::new(flat_volumes(8), stopped)),
        Box::new(GenerationAdapter::new()),
        Box::new(sink.clone()),
    )
    .unwrap();

    let summary = controller.run().unwrap();
    // Classified indices 4..7 evaluate labels at 2, 3, 4, 5 = [0, 1, 0, 1]
    assert_eq!(summary.classified, 4);
    assert_eq!(summary.correct, 2);

    let actuals: Vec<i32> = sink
        .observations()
        .iter()
        .filter_map(|o| match o {
            Observation::VolumeClassified { actual, .. } => Some(i32::from(*actual)),
            _ => None,
        })
        .collect();
    assert_eq!(actuals, vec![0, 1, 0, 1]);
}

#[test]
fn test_boundary_prediction_uses_pre_update_model() {
    // Incremental batch of 2 over classified indices 4..9: the model
    // generation observed by each prediction proves the update for a batch
    // lands strictly after the prediction for that batch's last volume.
    let stopped = Arc::new(AtomicBool::new(false));
    let sink = MemorySink::new();
    let controller = StreamingController::new(
        settings(4, 10, 0, 2),
        single_voxel_mask(),
        alternating_labels(10),
        Box::new(ScriptedWatcher::new(flat_volumes(10), stopped)),
        Box::new(GenerationAdapter::new()),
        Box::new(sink.clone()),
    )
    .unwrap();

    let summary = controller.run().unwrap();
    assert_eq!(summary.updates_applied, 3);

    let generations: Vec<i32> = sink
        .observations()
        .iter()
        .filter_map(|o| match o {
            Observation::VolumeClassified { predicted, .. } => Some(i32::from(*predicted)),
            _ => None,
        })
        .collect();
    // Volumes 4,5 see generation 0; 6,7 see 1; 8,9 see 2
    assert_eq!(generations, vec![0, 0, 1, 1, 2, 2]);
}

#[test]
fn test_zero_incremental_batch_never_updates() {
    let stopped = Arc::new(AtomicBool::new(false));
    let sink = MemorySink::new();
    let controller = StreamingController::new(
        settings(4, 12, 0, 0),
        single_voxel_mask(),
        alternating_labels(12),
        Box::new(ScriptedWatcher::new(flat_volumes(12), stopped)),
        Box::new(GenerationAdapter::new()),
        Box::new(sink.clone()),
    )
    .unwrap();

    let summary = controller.run().unwrap();
    assert_eq!(summary.updates_applied, 0);
    assert_eq!(sink.update_count(), 0);

    // The model stayed exactly as fit once: every prediction is generation 0
    let generations: Vec<i32> = sink
        .observations()
        .iter()
        .filter_map(|o| match o {
            Observation::VolumeClassified { predicted, .. } => Some(i32::from(*predicted)),
            _ => None,
        })
        .collect();
    assert!(generations.iter().all(|g| *g == 0));
}

#[test]
fn test_predict_before_fit_is_not_ready_and_state_pre_training() {
    let adapter = GenerationAdapter::new();
    assert!(matches!(
        adapter.predict(&FeatureVector::from(vec![0.0])),
        Err(RtDecodeError::NotReady(_))
    ));

    let stopped = Arc::new(AtomicBool::new(false));
    let controller = StreamingController::new(
        settings(5, 10, 0, 0),
        single_voxel_mask(),
        alternating_labels(10),
        Box::new(ScriptedWatcher::new(flat_volumes(10), stopped)),
        Box::new(GenerationAdapter::new()),
        Box::new(MemorySink::new()),
    )
    .unwrap();
    assert_eq!(controller.state(), RunState::Collecting);
}

#[test]
fn test_watcher_released_when_run_aborts() {
    let stopped = Arc::new(AtomicBool::new(false));
    let watcher = ScriptedWatcher::new(flat_volumes(10), stopped.clone()).failing_at(6);
    let controller = StreamingController::new(
        settings(5, 10, 0, 0),
        single_voxel_mask(),
        alternating_labels(10),
        Box::new(watcher),
        Box::new(BatchSoftmaxAdapter::new(0)),
        Box::new(MemorySink::new()),
    )
    .unwrap();

    assert!(controller.run().is_err());
    assert!(
        stopped.load(Ordering::Acquire),
        "watcher must be stopped before the error propagates"
    );
}

#[test]
fn test_incremental_config_requires_updatable_adapter() {
    let stopped = Arc::new(AtomicBool::new(false));
    let result = StreamingController::new(
        settings(5, 10, 0, 4),
        single_voxel_mask(),
        alternating_labels(10),
        Box::new(ScriptedWatcher::new(flat_volumes(10), stopped)),
        Box::new(BatchSoftmaxAdapter::new(0)),
        Box::new(MemorySink::new()),
    );
    assert!(matches!(result, Err(RtDecodeError::BadInput(_))));
}

#[test]
fn test_invalid_counts_rejected() {
    let stopped = Arc::new(AtomicBool::new(false));
    // train_count >= total_count leaves nothing to classify
    let result = StreamingController::new(
        settings(10, 10, 0, 0),
        single_voxel_mask(),
        alternating_labels(10),
        Box::new(ScriptedWatcher::new(flat_volumes(10), stopped)),
        Box::new(BatchSoftmaxAdapter::new(0)),
        Box::new(MemorySink::new()),
    );
    assert!(matches!(result, Err(RtDecodeError::BadInput(_))));
}

#[test]
fn test_short_label_sequence_rejected() {
    let stopped = Arc::new(AtomicBool::new(false));
    let result = StreamingController::new(
        settings(5, 10, 0, 0),
        single_voxel_mask(),
        alternating_labels(7),
        Box::new(ScriptedWatcher::new(flat_volumes(10), stopped)),
        Box::new(BatchSoftmaxAdapter::new(0)),
        Box::new(MemorySink::new()),
    );
    assert!(matches!(result, Err(RtDecodeError::BadInput(_))));
}

#[test]
fn test_failed_update_keeps_previous_model_live() {
    // An adapter whose updates always fail: the session must keep
    // classifying on the original model and count the failures.
    struct RejectingAdapter(GenerationAdapter);
    impl ModelAdapter for RejectingAdapter {
        fn name(&self) -> &'static str {
            "rejecting-probe"
        }
        fn fit(&mut self, f: &[FeatureVector], l: &[Label]) -> RtDecodeResult<()> {
            self.0.fit(f, l)
        }
        fn update(&mut self, _: &[FeatureVector], _: &[Label]) -> RtDecodeResult<()> {
            Err(RtDecodeError::ModelUpdate("label set mismatch".to_string()))
        }
        fn predict(&self, f: &FeatureVector) -> RtDecodeResult<Label> {
            self.0.predict(f)
        }
        fn supports_update(&self) -> bool {
            true
        }
        fn is_fitted(&self) -> bool {
            self.0.is_fitted()
        }
    }

    let stopped = Arc::new(AtomicBool::new(false));
    let sink = MemorySink::new();
    let controller = StreamingController::new(
        settings(4, 10, 0, 2),
        single_voxel_mask(),
        alternating_labels(10),
        Box::new(ScriptedWatcher::new(flat_volumes(10), stopped)),
        Box::new(RejectingAdapter(GenerationAdapter::new())),
        Box::new(sink.clone()),
    )
    .unwrap();

    let summary = controller.run().unwrap();
    assert_eq!(summary.updates_applied, 0);
    assert_eq!(summary.updates_failed, 3);
    assert_eq!(summary.classified, 6);

    // Every prediction still came from the original (generation 0) model
    let generations: Vec<i32> = sink
        .observations()
        .iter()
        .filter_map(|o| match o {
            Observation::VolumeClassified { predicted, .. } => Some(i32::from(*predicted)),
            _ => None,
        })
        .collect();
    assert!(generations.iter().all(|g| *g == 0));
}
