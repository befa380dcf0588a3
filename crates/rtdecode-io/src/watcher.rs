// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crossbeam::channel::{unbounded, Receiver, Sender};
use rtdecode_structures::{RtDecodeResult, Volume, VolumeIndex};
use std::path::PathBuf;
use std::time::Instant;

/// A file-creation notification observed by a producer.
///
/// `index` is pre-parsed from the file name when it matches the volume
/// naming pattern; unrelated files carry `None` and are discarded by the
/// consumer. Events are delivered in whatever order the producer observes
/// them, which is NOT guaranteed to be sequence-index order.
#[derive(Debug, Clone)]
pub struct ArrivalEvent {
    pub index: Option<VolumeIndex>,
    pub path: PathBuf,
    pub observed_at: Instant,
}

/// Creates the unbounded FIFO channel carrying [`ArrivalEvent`]s from a
/// notification producer to the single consuming watcher.
///
/// The producer side's only responsibility is enqueueing; all processing
/// happens on the consumer side.
pub fn arrival_channel() -> (Sender<ArrivalEvent>, Receiver<ArrivalEvent>) {
    unbounded()
}

/// Blocking, ordered source of parsed volumes.
///
/// `next_volume(expected)` blocks until the file for `expected` exists and
/// is fully readable, then returns its parsed contents. Implementations must
/// deliver volumes in strictly increasing index order even when filesystem
/// notifications arrive out of order, waiting explicitly for the expected
/// index rather than trusting event order.
pub trait ArrivalWatcher {
    /// Blocks until the volume for `expected` is on disk and parseable.
    fn next_volume(&mut self, expected: VolumeIndex) -> RtDecodeResult<Volume>;

    /// Releases any resources held by the watcher (producer threads, watch
    /// handles). Must be idempotent; called on every controller exit path.
    fn stop(&mut self);
}
