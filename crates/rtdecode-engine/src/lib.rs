// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The streaming classification engine: single-volume preprocessing,
//! pluggable model adapters, the session state machine that drives them,
//! and the metrics seam surrounding reporting hooks into.

mod controller;
mod metrics;
mod preprocess;

pub mod model;

pub use controller::{RunState, RunSummary, SessionSettings, StreamingController};
pub use metrics::{MemorySink, MetricsSink, Observation, TracingSink};
pub use model::{BatchSoftmaxAdapter, IncrementalSoftmaxAdapter, ModelAdapter};
pub use preprocess::Preprocessor;
