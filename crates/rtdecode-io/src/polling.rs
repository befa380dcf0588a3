// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{ArrivalWatcher, VolumeStore};
use rtdecode_structures::{RtDecodeError, RtDecodeResult, Volume, VolumeIndex};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Arrival watcher that polls for file existence on a fixed interval.
///
/// Simple and dependency-free, at the cost of up to one full interval of
/// added latency per volume and idle CPU wakeups. With no `wait_timeout`
/// configured the wait is unbounded, matching hardware-paced acquisition;
/// tests should configure one to avoid indefinite hangs.
pub struct PollingWatcher {
    store: VolumeStore,
    poll_interval: Duration,
    wait_timeout: Option<Duration>,
}

impl PollingWatcher {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

    pub fn new(store: VolumeStore, poll_interval: Duration) -> Self {
        PollingWatcher {
            store,
            poll_interval,
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
}

impl ArrivalWatcher for PollingWatcher {
    fn next_volume(&mut self, expected: VolumeIndex) -> RtDecodeResult<Volume> {
        let path = self.store.volume_path(expected);
        let wait_started = Instant::now();
        loop {
            if path.exists() {
                debug!(
                    "[WATCHER] Volume {} present after {:?} of polling",
                    expected,
                    wait_started.elapsed()
                );
                return self.store.read_volume_retrying(expected);
            }
            if let Some(timeout) = self.wait_timeout {
                if wait_started.elapsed() >= timeout {
                    return Err(RtDecodeError::ArrivalTimeout {
                        index: expected,
                        waited_ms: wait_started.elapsed().as_millis() as u64,
                    });
                }
            }
            trace!("[WATCHER] Volume {} not yet present, sleeping", expected);
            std::thread::sleep(self.poll_interval);
        }
    }

    fn stop(&mut self) {
        // Nothing to release: polling holds no producer thread or watch handle.
    }
}
