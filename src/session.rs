// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Session assembly: builds the store, watcher and adapter a resolved
//! configuration describes and runs one streaming session. This is the
//! seam surrounding tooling (CLI, job scripts, reporting) calls into.

use rtdecode_config::RtDecodeConfig;
use rtdecode_engine::{
    BatchSoftmaxAdapter, IncrementalSoftmaxAdapter, ModelAdapter, RunSummary, SessionSettings,
    StreamingController, TracingSink,
};
use rtdecode_io::{QueueWatcher, VolumeStore};
use rtdecode_structures::{RtDecodeError, RtDecodeResult};
use std::time::Duration;
use tracing::info;

/// Builds the volume store a configuration describes.
pub fn store_from_config(config: &RtDecodeConfig) -> VolumeStore {
    VolumeStore::new(&config.session.data_dir)
        .with_pattern(
            &config.session.volume_prefix,
            &config.session.volume_extension,
            config.session.index_pad_width,
        )
        .with_retry_policy(
            config.watcher.read_retries,
            Duration::from_millis(config.watcher.retry_backoff_ms),
        )
}

/// Builds the model adapter a configuration selects.
pub fn adapter_from_config(config: &RtDecodeConfig) -> RtDecodeResult<Box<dyn ModelAdapter>> {
    let model = &config.model;
    match model.kind.as_str() {
        "batch" => Ok(Box::new(
            BatchSoftmaxAdapter::new(model.seed)
                .with_training_parameters(model.learning_rate, model.fit_epochs),
        )),
        "incremental" => Ok(Box::new(
            IncrementalSoftmaxAdapter::new(model.seed).with_training_parameters(
                model.learning_rate,
                model.fit_epochs,
                model.update_epochs,
            ),
        )),
        other => Err(RtDecodeError::BadInput(format!(
            "unknown model kind '{}'",
            other
        ))),
    }
}

/// Runs one streaming session as described by a resolved configuration.
///
/// Arrival watching uses the event-driven [`QueueWatcher`] backed by the
/// built-in directory scanner; metrics go to the `tracing` log stream.
/// The mask and label files must already be on disk; volume files may keep
/// arriving while the session runs.
pub fn run_session_from_config(config: &RtDecodeConfig) -> RtDecodeResult<RunSummary> {
    let store = store_from_config(config);
    let mask = store.read_mask()?;
    let labels = store.read_labels()?;
    info!(
        "[SESSION] Loaded mask ({} voxels selected) and {} labels from {}",
        mask.voxel_count(),
        labels.len(),
        store.directory().display()
    );

    let mut watcher = QueueWatcher::with_scanner(
        store,
        Duration::from_millis(config.watcher.scan_interval_ms),
    )?;
    if config.watcher.wait_timeout_ms > 0 {
        watcher = watcher.with_wait_timeout(Duration::from_millis(config.watcher.wait_timeout_ms));
    }

    let adapter = adapter_from_config(config)?;
    let settings = SessionSettings {
        train_count: config.session.train_count,
        total_count: config.session.total_count,
        label_shift: config.session.label_shift,
        incremental_batch: config.session.incremental_batch,
    };

    let controller = StreamingController::new(
        settings,
        mask,
        labels,
        Box::new(watcher),
        adapter,
        Box::new(TracingSink::new()),
    )?;
    controller.run()
}
