//! Block-framed WAL writer.

use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};

use tracing::{trace, warn};

use crate::checksum;
use crate::wal::format::{frame_crc, RecordType, WalError, BLOCK_SIZE, LEGACY_HEADER_SIZE, RECYCLABLE_HEADER_SIZE};

/// Writes records to an append-only, 32 KiB block-framed stream.
///
/// Mirrors this crate's established `Arc<Mutex<File>>` convention so a
/// writer can be shared with a concurrent reader or a background sync
/// task without the caller re-deriving synchronization from scratch.
#[derive(Debug)]
pub struct WalWriter {
    sink: Arc<Mutex<File>>,
    block_offset: u64,
    log_number: u32,
    recyclable: bool,
}

impl WalWriter {
    /// Wraps `file` as a fresh writer starting at the current end of file.
    ///
    /// `log_number` is only meaningful when `recyclable` is `true`: it is
    /// stamped into every record header so a reader can detect stale
    /// fragments left over from a previous occupant of a recycled file.
    pub fn new(file: File, log_number: u32, recyclable: bool) -> std::io::Result<Self> {
        let offset = file.metadata()?.len() % BLOCK_SIZE;
        Ok(Self {
            sink: Arc::new(Mutex::new(file)),
            block_offset: offset,
            log_number,
            recyclable,
        })
    }

    /// Builds a writer sharing an already-wrapped sink, e.g. one also held
    /// by a rotation manager.
    pub fn from_shared(sink: Arc<Mutex<File>>, block_offset: u64, log_number: u32, recyclable: bool) -> Self {
        Self {
            sink,
            block_offset,
            log_number,
            recyclable,
        }
    }

    fn header_size(&self) -> usize {
        if self.recyclable {
            RECYCLABLE_HEADER_SIZE
        } else {
            LEGACY_HEADER_SIZE
        }
    }

    /// Appends `payload` as one logical record, fragmenting across block
    /// boundaries as needed. Returns the total number of bytes written to
    /// the sink, including all physical headers.
    pub fn add_record(&mut self, payload: &[u8]) -> Result<usize, WalError> {
        self.write_logical(payload, RecordKind::Data)
    }

    /// Writes a `SetCompression` meta-record announcing the compression
    /// algorithm (as a single byte) used by subsequent records.
    pub fn add_set_compression(&mut self, compression: u8) -> Result<usize, WalError> {
        self.write_logical(&[compression], RecordKind::SetCompression)
    }

    /// Writes a `UserDefinedTimestampSize` meta-record.
    pub fn add_user_defined_timestamp_size(&mut self, size: u16) -> Result<usize, WalError> {
        self.write_logical(&size.to_le_bytes(), RecordKind::UserDefinedTimestampSize)
    }

    /// Writes a `PredecessorWalInfo` meta-record: three little-endian
    /// fixed64 fields (predecessor log number, size in bytes, last
    /// sequence number).
    pub fn add_predecessor_wal_info(
        &mut self,
        predecessor_log_number: u64,
        size_bytes: u64,
        last_sequence: u64,
    ) -> Result<usize, WalError> {
        let mut payload = Vec::with_capacity(24);
        payload.extend_from_slice(&predecessor_log_number.to_le_bytes());
        payload.extend_from_slice(&size_bytes.to_le_bytes());
        payload.extend_from_slice(&last_sequence.to_le_bytes());
        self.write_logical(&payload, RecordKind::PredecessorWalInfo)
    }

    fn write_logical(&mut self, payload: &[u8], kind: RecordKind) -> Result<usize, WalError> {
        let header_size = self.header_size();
        let mut guard = self.sink.lock().map_err(|_| WalError::Corrupted("poisoned writer lock".into()))?;

        let max_fragment = BLOCK_SIZE as usize - header_size;
        let is_meta = !matches!(kind, RecordKind::Data);
        if is_meta && payload.len() > max_fragment {
            return Err(WalError::RecordTooLarge(payload.len()));
        }

        let mut total_written = 0usize;
        let mut remaining = payload;
        let mut first = true;

        loop {
            let space_in_block = (BLOCK_SIZE - self.block_offset) as usize;
            if space_in_block < header_size {
                let pad = vec![0u8; space_in_block];
                guard.write_all(&pad)?;
                total_written += pad.len();
                self.block_offset = 0;
                continue;
            }

            let max_payload_here = space_in_block - header_size;
            let fragment_len = remaining.len().min(max_payload_here);
            let is_last_fragment = fragment_len == remaining.len();

            let record_type = if is_meta {
                kind.meta_type(self.recyclable)
            } else if first && is_last_fragment {
                self.full_type()
            } else if first {
                self.first_type()
            } else if is_last_fragment {
                self.last_type()
            } else {
                self.middle_type()
            };

            let fragment = &remaining[..fragment_len];
            let n = self.write_physical(&mut guard, record_type, fragment)?;
            total_written += n;

            remaining = &remaining[fragment_len..];
            first = false;

            if remaining.is_empty() {
                break;
            }
        }

        trace!(
            payload_len = payload.len(),
            bytes_written = total_written,
            "WAL logical record written"
        );
        Ok(total_written)
    }

    fn write_physical(&mut self, file: &mut File, record_type: RecordType, fragment: &[u8]) -> Result<usize, WalError> {
        let length = u16::try_from(fragment.len()).map_err(|_| WalError::RecordTooLarge(fragment.len()))?;

        let raw_crc = frame_crc(record_type.as_u8(), self.recyclable.then_some(self.log_number), fragment);
        let masked_crc = checksum::mask(raw_crc);

        let mut header = Vec::with_capacity(record_type.header_size());
        header.extend_from_slice(&masked_crc.to_le_bytes());
        header.extend_from_slice(&length.to_le_bytes());
        header.push(record_type.as_u8());
        if record_type.is_recyclable() {
            header.extend_from_slice(&self.log_number.to_le_bytes());
        }

        file.write_all(&header)?;
        file.write_all(fragment)?;

        let written = header.len() + fragment.len();
        self.block_offset += written as u64;
        Ok(written)
    }

    fn full_type(&self) -> RecordType {
        if self.recyclable {
            RecordType::RecyclableFull
        } else {
            RecordType::Full
        }
    }
    fn first_type(&self) -> RecordType {
        if self.recyclable {
            RecordType::RecyclableFirst
        } else {
            RecordType::First
        }
    }
    fn middle_type(&self) -> RecordType {
        if self.recyclable {
            RecordType::RecyclableMiddle
        } else {
            RecordType::Middle
        }
    }
    fn last_type(&self) -> RecordType {
        if self.recyclable {
            RecordType::RecyclableLast
        } else {
            RecordType::Last
        }
    }

    /// Flushes and fsyncs the underlying file, if the sink exposes one.
    pub fn sync(&self) -> std::io::Result<()> {
        let guard = self.sink.lock().expect("writer lock poisoned");
        guard.sync_all()
    }

    /// Current offset within the active 32 KiB block.
    pub fn block_offset(&self) -> u64 {
        self.block_offset
    }

    /// The log number stamped into recyclable record headers.
    pub fn log_number(&self) -> u32 {
        self.log_number
    }
}

impl Drop for WalWriter {
    fn drop(&mut self) {
        if let Ok(guard) = self.sink.lock() {
            if let Err(e) = guard.sync_all() {
                warn!(error = %e, "WAL sync failed on drop");
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RecordKind {
    Data,
    SetCompression,
    UserDefinedTimestampSize,
    PredecessorWalInfo,
}

impl RecordKind {
    fn meta_type(self, recyclable: bool) -> RecordType {
        match (self, recyclable) {
            (RecordKind::Data, _) => unreachable!("Data never takes the meta path"),
            (RecordKind::SetCompression, _) => RecordType::SetCompression,
            (RecordKind::UserDefinedTimestampSize, false) => RecordType::UserDefinedTimestampSize,
            (RecordKind::UserDefinedTimestampSize, true) => RecordType::RecyclableUserDefinedTimestampSize,
            (RecordKind::PredecessorWalInfo, false) => RecordType::PredecessorWalInfo,
            (RecordKind::PredecessorWalInfo, true) => RecordType::RecyclablePredecessorWalInfo,
        }
    }
}
