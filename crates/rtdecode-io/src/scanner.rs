// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::{ArrivalEvent, VolumeStore};
use crossbeam::channel::Sender;
use rtdecode_structures::{RtDecodeError, RtDecodeResult};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Built-in file-creation notification producer.
///
/// A dedicated thread snapshots the run directory on a short cadence and
/// pushes one [`ArrivalEvent`] per newly observed entry into the arrival
/// channel. Its only responsibility is enqueueing; matching, ordering and
/// parsing all happen on the consumer side. Files already present at spawn
/// time are reported by the first sweep, so a consumer that starts late
/// still observes every volume.
///
/// The channel `Sender` seam means any external notification source (e.g.
/// an OS-level watch) can stand in for this scanner as the producer.
pub struct DirectoryScanner {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DirectoryScanner {
    /// Spawns the scanner thread over the store's directory.
    pub fn spawn(
        store: VolumeStore,
        scan_interval: Duration,
        sender: Sender<ArrivalEvent>,
    ) -> RtDecodeResult<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let handle = thread::Builder::new()
            .name("rtdecode-scanner".to_string())
            .spawn(move || scan_loop(store, scan_interval, sender, shutdown_flag))
            .map_err(RtDecodeError::Io)?;

        Ok(DirectoryScanner {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Signals the scanner thread to stop and waits for it to finish.
    /// Idempotent.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("[SCANNER] Scanner thread panicked during shutdown");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.load(Ordering::Acquire)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for DirectoryScanner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn scan_loop(
    store: VolumeStore,
    scan_interval: Duration,
    sender: Sender<ArrivalEvent>,
    shutdown: Arc<AtomicBool>,
) {
    info!(
        "[SCANNER] Watching {} every {:?}",
        store.directory().display(),
        scan_interval
    );
    let mut seen: HashSet<PathBuf> = HashSet::new();

    while !shutdown.load(Ordering::Acquire) {
        match std::fs::read_dir(store.directory()) {
            Ok(entries) => {
                let mut fresh: Vec<PathBuf> = entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| !seen.contains(path))
                    .collect();
                // Deterministic delivery within one sweep; cross-sweep order
                // still depends on write timing, consumers must not rely on it.
                fresh.sort();

                for path in fresh {
                    seen.insert(path.clone());
                    let event = ArrivalEvent {
                        index: store.parse_index(&path),
                        path,
                        observed_at: Instant::now(),
                    };
                    debug!(
                        "[SCANNER] New entry {:?} (index {:?})",
                        event.path.file_name(),
                        event.index
                    );
                    if sender.send(event).is_err() {
                        // Consumer went away, no reason to keep scanning
                        debug!("[SCANNER] Arrival channel disconnected, stopping");
                        return;
                    }
                }
            }
            Err(e) => {
                // Directory may not exist yet at session start
                debug!("[SCANNER] Cannot read directory: {}", e);
            }
        }
        std::thread::sleep(scan_interval);
    }
    info!("[SCANNER] Stopped");
}
