// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Disk access and arrival watching for the rtdecode pipeline.
//!
//! [`VolumeStore`] is the read-only accessor over the run directory layout
//! (numbered volume files, one mask file, one label-sequence file).
//! [`ArrivalWatcher`] implementations block until the next expected volume
//! is on disk and fully parseable:
//!
//! - [`PollingWatcher`] checks for file existence on a fixed interval;
//! - [`QueueWatcher`] blocks on a channel of [`ArrivalEvent`]s fed by a
//!   notification producer, by default the built-in [`DirectoryScanner`]
//!   thread.

mod polling;
mod queue_watcher;
mod scanner;
mod volume_store;
mod watcher;

pub use polling::PollingWatcher;
pub use queue_watcher::QueueWatcher;
pub use scanner::DirectoryScanner;
pub use volume_store::VolumeStore;
pub use watcher::{arrival_channel, ArrivalEvent, ArrivalWatcher};
