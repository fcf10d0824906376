//! Block-framed WAL reader: lenient (corrupted-tail-tolerant) and strict modes.

use std::io::Read;

use tracing::{trace, warn};

use crate::checksum;
use crate::wal::format::{
    frame_crc, is_safe_to_ignore_unknown, RecordType, WalError, BLOCK_SIZE, LEGACY_HEADER_SIZE,
};

/// A fully assembled logical record, or one of the semantic meta-records
/// interleaved in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// Payload reassembled from one or more physical fragments.
    Data(Vec<u8>),
    /// Announces the compression algorithm used by subsequent records.
    SetCompression(u8),
    /// Announces the user-defined timestamp size, in bytes.
    UserDefinedTimestampSize(u16),
    /// Identifies the WAL file this one logically continues from.
    PredecessorWalInfo {
        log_number: u64,
        size_bytes: u64,
        last_sequence: u64,
    },
}

/// How the reader responds to a corrupted or structurally invalid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderMode {
    /// Tolerate a corrupted tail: report once via the [`Reporter`], then
    /// behave as if the stream ended there. Matches WAL recovery, where a
    /// torn write at the very end of the last segment is expected and must
    /// not abort replay of everything written before it.
    Lenient,
    /// Treat any corruption as fatal and return the error immediately.
    /// Matches MANIFEST-style streams, where a corrupted record can never
    /// be the result of a torn final write.
    Strict,
}

/// Receives notifications about corruption and skipped stale records.
///
/// Every method has a no-op default so a caller that only cares about one
/// kind of event does not have to implement the other.
pub trait Reporter {
    /// A corruption was detected; `bytes_dropped` bytes were discarded.
    fn corruption(&mut self, bytes_dropped: u64, reason: &str) {
        let _ = (bytes_dropped, reason);
    }

    /// `bytes` belonging to a stale (recycled) record were skipped.
    fn old_record(&mut self, bytes: u64) {
        let _ = bytes;
    }
}

/// A [`Reporter`] that does nothing; used when no reporter is supplied.
impl Reporter for () {}

enum Assembly {
    Outside,
    Inside { buf: Vec<u8> },
}

/// Reads a block-framed WAL stream, reassembling fragmented records.
pub struct WalReader<R: Read> {
    source: R,
    mode: ReaderMode,
    reporter: Option<Box<dyn Reporter>>,
    expected_log_number: Option<u32>,
    pos: u64,
    assembly: Assembly,
    dead: bool,
}

impl<R: Read> WalReader<R> {
    /// Creates a reader starting at stream position 0.
    ///
    /// `expected_log_number` should be `Some` when replaying a recyclable
    /// file; a recyclable record whose stamped log number differs is
    /// treated as a leftover from a previous occupant of the file.
    pub fn new(source: R, mode: ReaderMode, expected_log_number: Option<u32>) -> Self {
        Self {
            source,
            mode,
            reporter: None,
            expected_log_number,
            pos: 0,
            assembly: Assembly::Outside,
            dead: false,
        }
    }

    /// Attaches a reporter sink for corruption and stale-record events.
    pub fn with_reporter(mut self, reporter: Box<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    fn report_corruption(&mut self, bytes_dropped: u64, reason: &str) {
        warn!(bytes_dropped, reason, "WAL corruption");
        if let Some(r) = self.reporter.as_mut() {
            r.corruption(bytes_dropped, reason);
        }
    }

    fn report_old_record(&mut self, bytes: u64) {
        if let Some(r) = self.reporter.as_mut() {
            r.old_record(bytes);
        }
    }

    /// Reads the next logical record, or `None` at end of stream.
    ///
    /// In [`ReaderMode::Lenient`] mode this never returns `Err` after the
    /// first corruption; it reports once and then returns `Ok(None)`
    /// forever, recovering the longest uncorrupted prefix of the stream.
    pub fn next_record(&mut self) -> Result<Option<WalRecord>, WalError> {
        if self.dead {
            return Ok(None);
        }
        match self.next_record_inner() {
            Ok(record) => Ok(record),
            Err(e) => match self.mode {
                ReaderMode::Strict => Err(e),
                ReaderMode::Lenient => {
                    self.dead = true;
                    self.report_corruption(0, &e.to_string());
                    Ok(None)
                }
            },
        }
    }

    fn block_remaining(&self) -> u64 {
        BLOCK_SIZE - (self.pos % BLOCK_SIZE)
    }

    fn read_exact_tracked(&mut self, buf: &mut [u8]) -> std::io::Result<bool> {
        match self.source.read_exact(buf) {
            Ok(()) => {
                self.pos += buf.len() as u64;
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reads one physical record header + payload at the current position.
    /// Returns `Ok(None)` at true end-of-stream (outside any block
    /// trailer) and `Ok(Some(..))` otherwise.
    fn read_physical(&mut self) -> Result<Option<(RecordType, u32, Vec<u8>)>, WalError> {
        loop {
            let remaining = self.block_remaining();
            if remaining < LEGACY_HEADER_SIZE as u64 {
                // Trailer padding: skip straight to the next block.
                let pad = remaining;
                let mut buf = vec![0u8; pad as usize];
                if !self.read_exact_tracked(&mut buf)? {
                    return Ok(None);
                }
                continue;
            }

            let mut mini_header = [0u8; LEGACY_HEADER_SIZE];
            if !self.read_exact_tracked(&mut mini_header)? {
                return Ok(None);
            }

            let stored_crc = u32::from_le_bytes(mini_header[0..4].try_into().unwrap());
            let length = u16::from_le_bytes(mini_header[4..6].try_into().unwrap()) as usize;
            let type_byte = mini_header[6];

            if type_byte == RecordType::Zero.as_u8() && stored_crc == 0 && length == 0 {
                // Zero padding that happened to leave room for a full
                // mini-header; treat as padding and keep scanning this
                // block rather than jumping away, since real data may
                // still follow within it.
                continue;
            }

            let record_type = match RecordType::from_u8(type_byte) {
                Some(t) => t,
                None => {
                    if is_safe_to_ignore_unknown(type_byte) {
                        // No declared length semantics for forward-compat
                        // codes beyond the mini-header; nothing more to
                        // skip here since such codes are only ever used
                        // for single, self-contained extension frames
                        // with non-fragmenting producers in this crate.
                        trace!(type_byte, "ignoring forward-compatible WAL record type");
                        continue;
                    }
                    return Err(WalError::InvalidType(type_byte));
                }
            };

            let log_number = if record_type.is_recyclable() {
                let mut buf = [0u8; 4];
                if !self.read_exact_tracked(&mut buf)? {
                    return Err(WalError::UnexpectedEof);
                }
                u32::from_le_bytes(buf)
            } else {
                0
            };

            let mut payload = vec![0u8; length];
            if length > 0 && !self.read_exact_tracked(&mut payload)? {
                return Err(WalError::Short);
            }

            let expected_crc = frame_crc(
                type_byte,
                record_type.is_recyclable().then_some(log_number),
                &payload,
            );
            if checksum::mask(expected_crc) != stored_crc {
                return Err(WalError::Corrupted("checksum mismatch".into()));
            }

            if record_type.is_recyclable() {
                if let Some(expected) = self.expected_log_number {
                    if expected != log_number {
                        self.report_old_record((mini_header.len() + 4 + payload.len()) as u64);
                        continue;
                    }
                }
            }

            return Ok(Some((record_type, log_number, payload)));
        }
    }

    fn next_record_inner(&mut self) -> Result<Option<WalRecord>, WalError> {
        loop {
            let Some((record_type, _log_number, payload)) = self.read_physical()? else {
                return match &self.assembly {
                    Assembly::Outside => Ok(None),
                    Assembly::Inside { .. } => Err(WalError::UnexpectedEof),
                };
            };

            match record_type {
                RecordType::Zero => continue,

                RecordType::SetCompression => {
                    if payload.len() != 1 {
                        return Err(WalError::Corrupted("SetCompression payload size".into()));
                    }
                    return Ok(Some(WalRecord::SetCompression(payload[0])));
                }
                RecordType::UserDefinedTimestampSize
                | RecordType::RecyclableUserDefinedTimestampSize => {
                    if payload.len() != 2 {
                        return Err(WalError::Corrupted(
                            "UserDefinedTimestampSize payload size".into(),
                        ));
                    }
                    let size = u16::from_le_bytes(payload[0..2].try_into().unwrap());
                    return Ok(Some(WalRecord::UserDefinedTimestampSize(size)));
                }
                RecordType::PredecessorWalInfo | RecordType::RecyclablePredecessorWalInfo => {
                    if payload.len() != 24 {
                        return Err(WalError::Corrupted(
                            "PredecessorWalInfo payload size".into(),
                        ));
                    }
                    let log_number = u64::from_le_bytes(payload[0..8].try_into().unwrap());
                    let size_bytes = u64::from_le_bytes(payload[8..16].try_into().unwrap());
                    let last_sequence = u64::from_le_bytes(payload[16..24].try_into().unwrap());
                    return Ok(Some(WalRecord::PredecessorWalInfo {
                        log_number,
                        size_bytes,
                        last_sequence,
                    }));
                }

                RecordType::Full | RecordType::RecyclableFull => match &self.assembly {
                    Assembly::Outside => return Ok(Some(WalRecord::Data(payload))),
                    Assembly::Inside { .. } => {
                        self.assembly = Assembly::Outside;
                        return Err(WalError::Corrupted(
                            "Full record arrived while a fragmented record was open".into(),
                        ));
                    }
                },

                RecordType::First | RecordType::RecyclableFirst => match &self.assembly {
                    Assembly::Outside => {
                        self.assembly = Assembly::Inside { buf: payload };
                    }
                    Assembly::Inside { .. } => {
                        // Reset and begin the new record; surfaced as an
                        // error so the caller's reporter can log it, but
                        // accumulation continues with the new fragment.
                        self.assembly = Assembly::Inside { buf: payload };
                        return Err(WalError::UnexpectedFirst);
                    }
                },

                RecordType::Middle | RecordType::RecyclableMiddle => match &mut self.assembly {
                    Assembly::Outside => return Err(WalError::UnexpectedMiddle),
                    Assembly::Inside { buf } => {
                        buf.extend_from_slice(&payload);
                    }
                },

                RecordType::Last | RecordType::RecyclableLast => match &mut self.assembly {
                    Assembly::Outside => return Err(WalError::UnexpectedLast),
                    Assembly::Inside { buf } => {
                        buf.extend_from_slice(&payload);
                        let assembled = std::mem::take(buf);
                        self.assembly = Assembly::Outside;
                        return Ok(Some(WalRecord::Data(assembled)));
                    }
                },
            }
        }
    }
}

impl<R: Read> Iterator for WalReader<R> {
    type Item = Result<WalRecord, WalError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
