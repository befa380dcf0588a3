// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use crate::VolumeIndex;

/// Common error type for rtdecode operations.
///
/// Covers the full taxonomy of the streaming pipeline: arrival races,
/// malformed data, model lifecycle violations, and plain I/O failures.
///
/// # Examples
/// ```
/// use rtdecode_structures::RtDecodeError;
///
/// fn validate_count(count: u32) -> Result<(), RtDecodeError> {
///     if count == 0 {
///         return Err(RtDecodeError::BadInput("count must be > 0".into()));
///     }
///     Ok(())
/// }
///
/// assert!(validate_count(0).is_err());
/// assert!(validate_count(5).is_ok());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum RtDecodeError {
    /// Expected volume file never appeared within the configured bounded wait
    #[error("timed out after {waited_ms} ms waiting for volume {index}")]
    ArrivalTimeout { index: VolumeIndex, waited_ms: u64 },

    /// File exists but its contents are not yet fully written
    #[error("volume file not fully written: {0}")]
    PartialRead(String),

    /// Malformed shapes or counts passed into a pipeline component
    #[error("bad input: {0}")]
    BadInput(String),

    /// Prediction requested before a model was fit
    #[error("model not ready: {0}")]
    NotReady(String),

    /// Incremental model update failed; the previous model remains live
    #[error("model update rejected: {0}")]
    ModelUpdate(String),

    /// Failed to deserialize bytes into a data structure
    #[error("failed to deserialize: {0}")]
    Deserialization(String),

    /// Underlying filesystem error
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// Arrival event source disconnected while the consumer was waiting
    #[error("event source stopped while waiting for volume {0}")]
    WatcherStopped(VolumeIndex),
}

/// Result type for rtdecode operations
pub type RtDecodeResult<T> = Result<T, RtDecodeError>;
