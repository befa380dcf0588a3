// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Binary on-disk format for volume and mask files.
//!
//! Both formats share the same layout: a 4-byte magic, a 1-byte format
//! version, the 3D dimensions as little-endian `u32`s, then the payload in
//! row-major order (`f32` voxel intensities for volumes, one byte per voxel
//! for masks).
//!
//! A file whose byte count is shorter than its header promises is reported
//! as [`RtDecodeError::PartialRead`]: the external producer writes files
//! front to back, so truncation is the signature of a file whose name exists
//! before its contents are flushed. Any other inconsistency is a
//! [`RtDecodeError::Deserialization`].

use crate::{RtDecodeError, RtDecodeResult};
use byteorder::{ByteOrder, LittleEndian};
use ndarray::Array3;

/// Magic prefix of a volume file
pub const VOLUME_MAGIC: [u8; 4] = *b"RTDV";
/// Magic prefix of a mask file
pub const MASK_MAGIC: [u8; 4] = *b"RTDM";
/// Current format version for both file kinds
pub const FORMAT_VERSION: u8 = 1;

/// magic (4) + version (1) + dims (3 x u32)
const HEADER_BYTE_COUNT: usize = 4 + 1 + 12;

/// Serializes volume voxel data into the on-disk byte format.
pub fn encode_volume(data: &Array3<f32>) -> Vec<u8> {
    let mut bytes = encode_header(VOLUME_MAGIC, data.shape(), data.len() * 4);
    for value in data.iter() {
        let mut buffer = [0u8; 4];
        LittleEndian::write_f32(&mut buffer, *value);
        bytes.extend_from_slice(&buffer);
    }
    bytes
}

/// Deserializes volume voxel data from the on-disk byte format.
pub fn decode_volume(bytes: &[u8]) -> RtDecodeResult<Array3<f32>> {
    let (dims, payload) = decode_header(bytes, VOLUME_MAGIC, "volume", 4)?;
    let values: Vec<f32> = payload
        .chunks_exact(4)
        .map(LittleEndian::read_f32)
        .collect();
    Array3::from_shape_vec(dims, values)
        .map_err(|e| RtDecodeError::Deserialization(format!("volume shape error: {}", e)))
}

/// Serializes mask voxel data into the on-disk byte format.
pub fn encode_mask(data: &Array3<bool>) -> Vec<u8> {
    let mut bytes = encode_header(MASK_MAGIC, data.shape(), data.len());
    bytes.extend(data.iter().map(|selected| u8::from(*selected)));
    bytes
}

/// Deserializes mask voxel data from the on-disk byte format.
///
/// # Errors
/// Mask payload bytes other than 0 or 1 are a deserialization error, never
/// silently coerced.
pub fn decode_mask(bytes: &[u8]) -> RtDecodeResult<Array3<bool>> {
    let (dims, payload) = decode_header(bytes, MASK_MAGIC, "mask", 1)?;
    let mut values = Vec::with_capacity(payload.len());
    for byte in payload {
        match byte {
            0 => values.push(false),
            1 => values.push(true),
            other => {
                return Err(RtDecodeError::Deserialization(format!(
                    "mask voxel byte must be 0 or 1, found {}",
                    other
                )))
            }
        }
    }
    Array3::from_shape_vec(dims, values)
        .map_err(|e| RtDecodeError::Deserialization(format!("mask shape error: {}", e)))
}

fn encode_header(magic: [u8; 4], shape: &[usize], payload_bytes: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_BYTE_COUNT + payload_bytes);
    bytes.extend_from_slice(&magic);
    bytes.push(FORMAT_VERSION);
    for dim in shape {
        let mut buffer = [0u8; 4];
        LittleEndian::write_u32(&mut buffer, *dim as u32);
        bytes.extend_from_slice(&buffer);
    }
    bytes
}

/// Validates magic, version and dimensions, returning dims and the payload
/// slice. `bytes_per_voxel` is 4 for volumes and 1 for masks.
fn decode_header<'a>(
    bytes: &'a [u8],
    expected_magic: [u8; 4],
    kind: &str,
    bytes_per_voxel: usize,
) -> RtDecodeResult<((usize, usize, usize), &'a [u8])> {
    if bytes.len() < HEADER_BYTE_COUNT {
        return Err(RtDecodeError::PartialRead(format!(
            "{} header incomplete: {} of {} bytes present",
            kind,
            bytes.len(),
            HEADER_BYTE_COUNT
        )));
    }
    if bytes[0..4] != expected_magic {
        return Err(RtDecodeError::Deserialization(format!(
            "not a {} file (magic mismatch)",
            kind
        )));
    }
    if bytes[4] != FORMAT_VERSION {
        return Err(RtDecodeError::Deserialization(format!(
            "unsupported {} format version {}",
            kind, bytes[4]
        )));
    }

    let x = LittleEndian::read_u32(&bytes[5..9]) as usize;
    let y = LittleEndian::read_u32(&bytes[9..13]) as usize;
    let z = LittleEndian::read_u32(&bytes[13..17]) as usize;
    let voxel_count = x
        .checked_mul(y)
        .and_then(|xy| xy.checked_mul(z))
        .ok_or_else(|| {
            RtDecodeError::Deserialization(format!("{} dimensions overflow", kind))
        })?;
    let expected_payload = voxel_count * bytes_per_voxel;

    let payload = &bytes[HEADER_BYTE_COUNT..];
    if payload.len() < expected_payload {
        return Err(RtDecodeError::PartialRead(format!(
            "{} payload incomplete: {} of {} bytes present",
            kind,
            payload.len(),
            expected_payload
        )));
    }
    if payload.len() > expected_payload {
        return Err(RtDecodeError::Deserialization(format!(
            "{} payload has {} trailing bytes",
            kind,
            payload.len() - expected_payload
        )));
    }
    Ok(((x, y, z), payload))
}
