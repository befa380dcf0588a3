// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Typed configuration sections with defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete rtdecode configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RtDecodeConfig {
    pub session: SessionSection,
    pub watcher: WatcherSection,
    pub model: ModelSection,
}

/// Run-level parameters: where the volumes are and how the run is split
/// between training and classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Directory the external producer writes into
    pub data_dir: PathBuf,
    /// Volume file name prefix (`vol` -> `vol_0007.vol`)
    pub volume_prefix: String,
    /// Volume file extension
    pub volume_extension: String,
    /// Zero-padding width of the index in volume file names
    pub index_pad_width: usize,
    /// Number of leading volumes collected before the initial training
    pub train_count: u32,
    /// Total number of volumes in the run
    pub total_count: u32,
    /// Label shift in index units (delayed response alignment)
    pub label_shift: u32,
    /// Incremental re-fit cadence in volumes; 0 disables updating
    pub incremental_batch: u32,
}

impl Default for SessionSection {
    fn default() -> Self {
        SessionSection {
            data_dir: PathBuf::from("./data"),
            volume_prefix: "vol".to_string(),
            volume_extension: "vol".to_string(),
            index_pad_width: 4,
            train_count: 20,
            total_count: 100,
            label_shift: 2,
            incremental_batch: 0,
        }
    }
}

/// Arrival watching knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherSection {
    /// Polling-watcher existence check interval
    pub poll_interval_ms: u64,
    /// Directory-scanner sweep interval
    pub scan_interval_ms: u64,
    /// Bounded retry count for partially written files
    pub read_retries: u32,
    /// Backoff between partial-read retries
    pub retry_backoff_ms: u64,
    /// Bounded wait per volume; 0 waits forever (hardware-paced acquisition)
    pub wait_timeout_ms: u64,
}

impl Default for WatcherSection {
    fn default() -> Self {
        WatcherSection {
            poll_interval_ms: 50,
            scan_interval_ms: 20,
            read_retries: 10,
            retry_backoff_ms: 20,
            wait_timeout_ms: 0,
        }
    }
}

/// Model adapter selection and training hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// `"batch"` (train once) or `"incremental"` (continuously re-fit)
    pub kind: String,
    /// Random seed for model initialization, for reproducible runs
    pub seed: u64,
    pub learning_rate: f32,
    pub fit_epochs: u32,
    pub update_epochs: u32,
}

impl Default for ModelSection {
    fn default() -> Self {
        ModelSection {
            kind: "batch".to_string(),
            seed: 0,
            learning_rate: 0.05,
            fit_epochs: 200,
            update_epochs: 10,
        }
    }
}
