//! Checksum Module
//!
//! This module implements the block-level checksumming used to detect
//! corruption in on-disk records: WAL physical records, write-batch
//! payloads, and (by external SST readers) table blocks.
//!
//! ## Design Overview
//!
//! Four checksum algorithms are supported, selected per-block by a
//! [`ChecksumType`] tag so that a reader never has to guess which
//! algorithm produced a given trailer:
//!
//! - [`ChecksumType::NoChecksum`] — no verification, trailer is ignored.
//! - [`ChecksumType::Crc32c`] — CRC-32C (Castagnoli), computed with the
//!   [`crc32c`] crate.
//! - [`ChecksumType::Xxh3`] — XXH3-64 (format_version 5+), computed with
//!   [`xxhash_rust::xxh3`] and truncated to its low 32 bits.
//! - [`ChecksumType::XxHash64`] — 64-bit XXHash, computed with
//!   [`xxhash_rust::xxh64`] and truncated to its low 32 bits.
//!
//! CRC32C values are additionally **masked** before being stored on disk.
//! The mask rotates the checksum so that byte sequences that happen to
//! contain an embedded, valid CRC of a *different* length do not read back
//! as coincidentally valid — the same rationale RocksDB and LevelDB give
//! for masking. [`mask`] and [`unmask`] are exact inverses.
//!
//! Every checksum is computed over the record payload *plus one extra
//! byte* identifying the record's type tag, so that a bit flip that
//! changes, say, a `kFullType` record into a `kLastType` record is also
//! caught. [`checksum_with_last_byte`] implements this composition once so
//! callers (WAL writer/reader, write-batch validation) do not duplicate it.
//! CRC32C and XXHash64 fold the extra byte into the hash input; XXH3
//! instead hashes `data` alone and XORs the result with `last * 0x6B9083D9`,
//! with an explicit `data = []` ⇒ `0` special case — this is the published
//! XXH3 block-checksum composition, not a generic concatenation.

#[cfg(test)]
mod tests;

use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// Error Types
// ------------------------------------------------------------------------------------------------

/// Errors returned by checksum verification.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ChecksumError {
    /// The computed checksum did not match the stored trailer.
    #[error("checksum mismatch: expected {expected:#010x}, computed {actual:#010x}")]
    Mismatch { expected: u32, actual: u32 },
}

// ------------------------------------------------------------------------------------------------
// Checksum type selector
// ------------------------------------------------------------------------------------------------

/// Identifies which algorithm produced a stored checksum.
///
/// The numeric values are stable and persisted on disk (WAL record
/// headers, write-batch serialization); do not renumber existing variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChecksumType {
    /// No checksum is computed or verified.
    NoChecksum = 0,
    /// CRC-32C (Castagnoli polynomial), masked before storage.
    Crc32c = 1,
    /// XXH3-64 (format_version 5+), truncated to 32 bits with the
    /// last-byte XOR modifier.
    Xxh3 = 2,
    /// 64-bit XXHash, truncated to 32 bits in the trailer.
    XxHash64 = 3,
}

impl ChecksumType {
    /// Recovers a [`ChecksumType`] from its on-disk byte value.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::NoChecksum),
            1 => Some(Self::Crc32c),
            2 => Some(Self::Xxh3),
            3 => Some(Self::XxHash64),
            _ => None,
        }
    }

    /// The on-disk byte value for this algorithm.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

// ------------------------------------------------------------------------------------------------
// CRC32C masking
// ------------------------------------------------------------------------------------------------

/// Rotation applied when masking a CRC32C value, taken from the
/// LevelDB/RocksDB `crc32c::Mask` constant.
const MASK_DELTA: u32 = 0xA282_EAD8;

/// Multiplier applied to the trailing type byte in the XXH3 block-checksum
/// composition; see [`checksum_with_last_byte`].
const XXH3_LAST_BYTE_MODIFIER: u32 = 0x6B90_83D9;

/// Masks a raw CRC32C value before storing it on disk.
///
/// Masking is not for security; it only prevents a byte string that
/// embeds a CRC of a different piece of data from appearing to be a
/// valid checksum of the record that contains it.
pub fn mask(crc: u32) -> u32 {
    ((crc >> 15) | (crc << 17)).wrapping_add(MASK_DELTA)
}

/// Inverse of [`mask`]; recovers the raw CRC32C value from a stored one.
pub fn unmask(masked_crc: u32) -> u32 {
    let rot = masked_crc.wrapping_sub(MASK_DELTA);
    (rot >> 17) | (rot << 15)
}

// ------------------------------------------------------------------------------------------------
// Algorithm dispatch
// ------------------------------------------------------------------------------------------------

/// Computes the raw (unmasked) checksum of `data` using `kind`.
///
/// `Crc32c` results are raw CRC32C values; callers that persist them in a
/// WAL record trailer must [`mask`] the result first, matching the
/// on-disk convention. `NoChecksum` always returns 0.
pub fn checksum(kind: ChecksumType, data: &[u8]) -> u32 {
    match kind {
        ChecksumType::NoChecksum => 0,
        ChecksumType::Crc32c => crc32c::crc32c(data),
        ChecksumType::Xxh3 => xxhash_rust::xxh3::xxh3_64(data) as u32,
        ChecksumType::XxHash64 => xxhash_rust::xxh64::xxh64(data, 0) as u32,
    }
}

/// Computes a checksum over `data` followed by a single trailing byte.
///
/// This is the composition used by the WAL writer: the checksum must
/// cover both the record payload and its type tag, so that corruption
/// which only flips the type byte is still detected. CRC32C and XXHash64
/// fold `last_byte` into the hash input directly; XXH3 instead hashes
/// `data` alone and XORs the low 32 bits with `last_byte * 0x6B9083D9`,
/// with `data = []` special-cased to `0` regardless of `last_byte`.
pub fn checksum_with_last_byte(kind: ChecksumType, data: &[u8], last_byte: u8) -> u32 {
    match kind {
        ChecksumType::NoChecksum => 0,
        ChecksumType::Crc32c => {
            let partial = crc32c::crc32c(data);
            crc32c::crc32c_append(partial, &[last_byte])
        }
        ChecksumType::Xxh3 => {
            if data.is_empty() {
                return 0;
            }
            let base = xxhash_rust::xxh3::xxh3_64(data) as u32;
            base ^ (last_byte as u32).wrapping_mul(XXH3_LAST_BYTE_MODIFIER)
        }
        ChecksumType::XxHash64 => {
            let mut buf = Vec::with_capacity(data.len() + 1);
            buf.extend_from_slice(data);
            buf.push(last_byte);
            xxhash_rust::xxh64::xxh64(&buf, 0) as u32
        }
    }
}

/// Verifies that `data` (optionally followed by `last_byte`) matches a
/// stored trailer value.
///
/// For `Crc32c`, `expected` is assumed to already be the *masked* value
/// as read from disk; it is unmasked internally before comparison.
pub fn verify(
    kind: ChecksumType,
    data: &[u8],
    last_byte: Option<u8>,
    expected: u32,
) -> Result<(), ChecksumError> {
    if kind == ChecksumType::NoChecksum {
        return Ok(());
    }

    let actual_raw = match last_byte {
        Some(b) => checksum_with_last_byte(kind, data, b),
        None => checksum(kind, data),
    };

    let (actual, expected) = if kind == ChecksumType::Crc32c {
        (mask(actual_raw), expected)
    } else {
        (actual_raw, expected)
    };

    if actual == expected {
        Ok(())
    } else {
        Err(ChecksumError::Mismatch { expected, actual })
    }
}
