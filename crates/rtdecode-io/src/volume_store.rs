// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use rtdecode_structures::codec;
use rtdecode_structures::{Label, RtDecodeError, RtDecodeResult, Volume, VolumeIndex, VolumeMask};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Read-only accessor for the on-disk run directory.
///
/// The directory is flat: sequentially numbered volume files named by a
/// fixed zero-padded pattern (`vol_0007.vol`), a single mask file and a
/// single label-sequence file, all written by the external producer before
/// or during the run. The store carries no state beyond its configuration.
#[derive(Debug, Clone)]
pub struct VolumeStore {
    directory: PathBuf,
    volume_prefix: String,
    volume_extension: String,
    index_pad_width: usize,
    read_retries: u32,
    retry_backoff: Duration,
}

impl VolumeStore {
    pub const DEFAULT_VOLUME_PREFIX: &'static str = "vol";
    pub const DEFAULT_VOLUME_EXTENSION: &'static str = "vol";
    pub const DEFAULT_INDEX_PAD_WIDTH: usize = 4;
    pub const DEFAULT_READ_RETRIES: u32 = 10;
    pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(20);
    pub const MASK_FILE_NAME: &'static str = "mask.vmask";
    pub const LABELS_FILE_NAME: &'static str = "labels.json";

    /// Creates a store over `directory` with the default file pattern and
    /// retry policy.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        VolumeStore {
            directory: directory.into(),
            volume_prefix: Self::DEFAULT_VOLUME_PREFIX.to_string(),
            volume_extension: Self::DEFAULT_VOLUME_EXTENSION.to_string(),
            index_pad_width: Self::DEFAULT_INDEX_PAD_WIDTH,
            read_retries: Self::DEFAULT_READ_RETRIES,
            retry_backoff: Self::DEFAULT_RETRY_BACKOFF,
        }
    }

    /// Overrides the volume file naming pattern (`prefix_NNNN.extension`).
    pub fn with_pattern(mut self, prefix: &str, extension: &str, pad_width: usize) -> Self {
        self.volume_prefix = prefix.to_string();
        self.volume_extension = extension.to_string();
        self.index_pad_width = pad_width;
        self
    }

    /// Overrides the bounded retry policy for partially written files.
    pub fn with_retry_policy(mut self, retries: u32, backoff: Duration) -> Self {
        self.read_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the volume file for `index`.
    pub fn volume_path(&self, index: VolumeIndex) -> PathBuf {
        self.directory.join(format!(
            "{}_{:0width$}.{}",
            self.volume_prefix,
            *index,
            self.volume_extension,
            width = self.index_pad_width
        ))
    }

    pub fn mask_path(&self) -> PathBuf {
        self.directory.join(Self::MASK_FILE_NAME)
    }

    pub fn labels_path(&self) -> PathBuf {
        self.directory.join(Self::LABELS_FILE_NAME)
    }

    /// Parses the volume index out of a file name produced by this store's
    /// naming pattern. Returns `None` for the mask file, the label file, and
    /// anything else that does not match.
    pub fn parse_index(&self, path: &Path) -> Option<VolumeIndex> {
        let file_name = path.file_name()?.to_str()?;
        let stem = file_name.strip_suffix(&format!(".{}", self.volume_extension))?;
        let digits = stem.strip_prefix(&format!("{}_", self.volume_prefix))?;
        if digits.len() != self.index_pad_width || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse::<u32>().ok().map(VolumeIndex::new)
    }

    /// Reads and parses the volume file for `index` in a single attempt.
    ///
    /// A file whose contents are not yet flushed surfaces as
    /// [`RtDecodeError::PartialRead`]; callers that tolerate arrival races
    /// should go through [`read_volume_retrying`](Self::read_volume_retrying).
    pub fn read_volume(&self, index: VolumeIndex) -> RtDecodeResult<Volume> {
        let bytes = fs::read(self.volume_path(index))?;
        let data = codec::decode_volume(&bytes)?;
        Ok(Volume::new(index, data))
    }

    /// Reads the volume file for `index`, retrying with a fixed backoff while
    /// the file is only partially written.
    ///
    /// The retry budget is bounded: after `read_retries` failed re-attempts
    /// the last [`RtDecodeError::PartialRead`] escalates to the caller. Other
    /// errors are never retried.
    pub fn read_volume_retrying(&self, index: VolumeIndex) -> RtDecodeResult<Volume> {
        let mut attempt = 0;
        loop {
            match self.read_volume(index) {
                Ok(volume) => return Ok(volume),
                Err(RtDecodeError::PartialRead(detail)) => {
                    if attempt >= self.read_retries {
                        warn!(
                            "[VOLUME-STORE] Volume {} still partial after {} retries",
                            index, self.read_retries
                        );
                        return Err(RtDecodeError::PartialRead(detail));
                    }
                    attempt += 1;
                    debug!(
                        "[VOLUME-STORE] Volume {} partially written ({}), retry {}/{}",
                        index, detail, attempt, self.read_retries
                    );
                    std::thread::sleep(self.retry_backoff);
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Reads the run-constant voxel mask.
    pub fn read_mask(&self) -> RtDecodeResult<VolumeMask> {
        let bytes = fs::read(self.mask_path())?;
        VolumeMask::new(codec::decode_mask(&bytes)?)
    }

    /// Reads the full ground-truth label sequence.
    ///
    /// The label file must exist in full before training can proceed; a
    /// missing or unparseable file is an error, never retried.
    pub fn read_labels(&self) -> RtDecodeResult<Vec<Label>> {
        let text = fs::read_to_string(self.labels_path())?;
        let codes: Vec<i32> = serde_json::from_str(&text)
            .map_err(|e| RtDecodeError::Deserialization(format!("label file: {}", e)))?;
        Ok(codes.into_iter().map(Label::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_path_zero_padding() {
        let store = VolumeStore::new("/data/run1");
        assert_eq!(
            store.volume_path(7.into()),
            PathBuf::from("/data/run1/vol_0007.vol")
        );
        let wide = VolumeStore::new("/data/run1").with_pattern("img", "bin", 6);
        assert_eq!(
            wide.volume_path(42.into()),
            PathBuf::from("/data/run1/img_000042.bin")
        );
    }

    #[test]
    fn test_parse_index_roundtrip() {
        let store = VolumeStore::new("/data/run1");
        let path = store.volume_path(31.into());
        assert_eq!(store.parse_index(&path), Some(VolumeIndex::new(31)));
    }

    #[test]
    fn test_parse_index_rejects_other_files() {
        let store = VolumeStore::new("/data/run1");
        assert_eq!(store.parse_index(&store.mask_path()), None);
        assert_eq!(store.parse_index(&store.labels_path()), None);
        assert_eq!(store.parse_index(Path::new("/data/run1/vol_12.vol")), None);
        assert_eq!(store.parse_index(Path::new("/data/run1/vol_abcd.vol")), None);
    }
}
