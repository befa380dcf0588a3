// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{arrival_channel, ArrivalEvent, ArrivalWatcher, DirectoryScanner, VolumeStore};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use rtdecode_structures::{RtDecodeError, RtDecodeResult, Volume, VolumeIndex};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Event-driven arrival watcher: blocks on a FIFO queue of
/// [`ArrivalEvent`]s instead of polling for existence.
///
/// Notification order is NOT trusted to equal sequence-index order. The
/// watcher waits explicitly for the event matching the expected index and
/// discards everything else; a discarded event is safe to drop because the
/// file it announced is on disk by the time its index becomes the expected
/// one, and the existence pre-check short-circuits the queue wait.
pub struct QueueWatcher {
    store: VolumeStore,
    receiver: Receiver<ArrivalEvent>,
    scanner: Option<DirectoryScanner>,
    wait_timeout: Option<Duration>,
}

impl QueueWatcher {
    /// Granularity of the blocking queue read, so an unbounded wait still
    /// notices channel disconnection promptly.
    const RECV_SLICE: Duration = Duration::from_millis(250);

    /// Creates a watcher fed by the built-in [`DirectoryScanner`] producer.
    pub fn with_scanner(store: VolumeStore, scan_interval: Duration) -> RtDecodeResult<Self> {
        let (sender, receiver) = arrival_channel();
        let scanner = DirectoryScanner::spawn(store.clone(), scan_interval, sender)?;
        Ok(QueueWatcher {
            store,
            receiver,
            scanner: Some(scanner),
            wait_timeout: None,
        })
    }

    /// Creates a watcher fed by an external notification producer that
    /// pushes into the paired [`arrival_channel`] sender.
    pub fn from_source(store: VolumeStore, receiver: Receiver<ArrivalEvent>) -> Self {
        QueueWatcher {
            store,
            receiver,
            scanner: None,
            wait_timeout: None,
        }
    }

    /// Bounds each `next_volume` wait. Exceeding it surfaces as
    /// [`RtDecodeError::ArrivalTimeout`].
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn store(&self) -> &VolumeStore {
        &self.store
    }

    /// Whether `event` announces the file the consumer is waiting for.
    fn matches(&self, event: &ArrivalEvent, expected: VolumeIndex) -> bool {
        event.index == Some(expected) || event.path == self.store.volume_path(expected)
    }
}

impl ArrivalWatcher for QueueWatcher {
    fn next_volume(&mut self, expected: VolumeIndex) -> RtDecodeResult<Volume> {
        let wait_started = Instant::now();
        loop {
            // The notification for `expected` may have been observed (and
            // discarded) while an earlier index was awaited, or the file may
            // predate the producer entirely.
            if self.store.volume_path(expected).exists() {
                return self.store.read_volume_retrying(expected);
            }

            let slice = match self.wait_timeout {
                Some(timeout) => {
                    let elapsed = wait_started.elapsed();
                    if elapsed >= timeout {
                        return Err(RtDecodeError::ArrivalTimeout {
                            index: expected,
                            waited_ms: elapsed.as_millis() as u64,
                        });
                    }
                    (timeout - elapsed).min(Self::RECV_SLICE)
                }
                None => Self::RECV_SLICE,
            };

            match self.receiver.recv_timeout(slice) {
                Ok(event) => {
                    if self.matches(&event, expected) {
                        debug!(
                            "[WATCHER] Volume {} announced after {:?}",
                            expected,
                            wait_started.elapsed()
                        );
                        return self.store.read_volume_retrying(expected);
                    }
                    // Out-of-order or unrelated notification
                    trace!(
                        "[WATCHER] Discarding event {:?} while waiting for volume {}",
                        event.path.file_name(),
                        expected
                    );
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(RtDecodeError::WatcherStopped(expected));
                }
            }
        }
    }

    fn stop(&mut self) {
        if let Some(mut scanner) = self.scanner.take() {
            scanner.stop();
        }
    }
}

impl Drop for QueueWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
