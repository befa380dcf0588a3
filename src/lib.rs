// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # rtdecode - Real-Time Volume Streaming Classification
//!
//! rtdecode consumes sequentially numbered 3D volume files as an external
//! producer writes them to disk, preprocesses each one within the
//! inter-arrival latency budget, trains a classifier once a configured
//! number of volumes has been collected, and classifies every volume that
//! follows - optionally re-fitting the model on a fixed cadence.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! rtdecode = "0.1"
//! ```
//!
//! ```rust,no_run
//! use rtdecode::config::RtDecodeConfig;
//! use rtdecode::session::run_session_from_config;
//!
//! let mut config = RtDecodeConfig::default();
//! config.session.data_dir = "./run_data".into();
//! let summary = run_session_from_config(&config).unwrap();
//! println!("accuracy: {:.3}", summary.accuracy);
//! ```
//!
//! ## Crates
//!
//! - [`structures`]: volumes, masks, feature vectors, the error type
//! - [`io`]: volume store and arrival watchers
//! - [`engine`]: preprocessing, model adapters, the session state machine
//! - [`config`]: TOML configuration with environment overrides

pub use rtdecode_config as config;
pub use rtdecode_engine as engine;
pub use rtdecode_io as io;
pub use rtdecode_structures as structures;

pub mod session;

/// Most commonly used types in one import.
pub mod prelude {
    pub use crate::session::run_session_from_config;
    pub use rtdecode_config::{load_config, RtDecodeConfig};
    pub use rtdecode_engine::{
        BatchSoftmaxAdapter, IncrementalSoftmaxAdapter, MemorySink, MetricsSink, ModelAdapter,
        Preprocessor, RunSummary, SessionSettings, StreamingController, TracingSink,
    };
    pub use rtdecode_io::{ArrivalWatcher, PollingWatcher, QueueWatcher, VolumeStore};
    pub use rtdecode_structures::{
        FeatureVector, Label, RtDecodeError, RtDecodeResult, Volume, VolumeIndex, VolumeMask,
    };
}
