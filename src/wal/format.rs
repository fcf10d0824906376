//! On-disk physical record framing shared by the writer and reader.

use thiserror::Error;

/// Bytes reserved for one 32 KiB block.
pub const BLOCK_SIZE: u64 = 32 * 1024;

/// `checksum(4) + length(2) + type(1)`.
pub const LEGACY_HEADER_SIZE: usize = 7;

/// `checksum(4) + length(2) + type(1) + log_number(4)`.
pub const RECYCLABLE_HEADER_SIZE: usize = 11;

/// Physical record type as it appears on disk, in the byte immediately
/// following the 2-byte length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Zero-fill trailer padding at the end of a block.
    Zero = 0,
    /// Legacy: a complete, unfragmented record.
    Full = 1,
    /// Legacy: the first fragment of a multi-block record.
    First = 2,
    /// Legacy: an interior fragment.
    Middle = 3,
    /// Legacy: the last fragment of a multi-block record.
    Last = 4,
    /// Recyclable variant of [`Self::Full`]; carries a log number.
    RecyclableFull = 5,
    /// Recyclable variant of [`Self::First`].
    RecyclableFirst = 6,
    /// Recyclable variant of [`Self::Middle`].
    RecyclableMiddle = 7,
    /// Recyclable variant of [`Self::Last`].
    RecyclableLast = 8,
    /// Announces the compression algorithm used for subsequent records.
    SetCompression = 9,
    /// Legacy: announces the user-defined timestamp size in bytes.
    UserDefinedTimestampSize = 10,
    /// Recyclable variant of [`Self::UserDefinedTimestampSize`].
    RecyclableUserDefinedTimestampSize = 11,
    /// Legacy: identifies the WAL file that logically precedes this one.
    PredecessorWalInfo = 130,
    /// Recyclable variant of [`Self::PredecessorWalInfo`].
    RecyclablePredecessorWalInfo = 131,
}

impl RecordType {
    /// Decodes a physical type byte.
    ///
    /// Returns `None` for a value this crate does not assign meaning to.
    /// Callers must separately apply the "bit 7 set is safe to ignore"
    /// rule for values this returns `None` for.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Zero),
            1 => Some(Self::Full),
            2 => Some(Self::First),
            3 => Some(Self::Middle),
            4 => Some(Self::Last),
            5 => Some(Self::RecyclableFull),
            6 => Some(Self::RecyclableFirst),
            7 => Some(Self::RecyclableMiddle),
            8 => Some(Self::RecyclableLast),
            9 => Some(Self::SetCompression),
            10 => Some(Self::UserDefinedTimestampSize),
            11 => Some(Self::RecyclableUserDefinedTimestampSize),
            130 => Some(Self::PredecessorWalInfo),
            131 => Some(Self::RecyclablePredecessorWalInfo),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether this physical type carries a 4-byte log number after the
    /// type byte.
    pub fn is_recyclable(self) -> bool {
        matches!(
            self,
            Self::RecyclableFull
                | Self::RecyclableFirst
                | Self::RecyclableMiddle
                | Self::RecyclableLast
                | Self::RecyclableUserDefinedTimestampSize
                | Self::RecyclablePredecessorWalInfo
        )
    }

    /// The on-disk header size (including the log number, if recyclable)
    /// for this record type.
    pub fn header_size(self) -> usize {
        if self.is_recyclable() {
            RECYCLABLE_HEADER_SIZE
        } else {
            LEGACY_HEADER_SIZE
        }
    }
}

/// Whether a safe-to-ignore, forward-compatible type byte (bit 7 set, but
/// not one of this module's recognized codes) was observed.
pub fn is_safe_to_ignore_unknown(byte: u8) -> bool {
    RecordType::from_u8(byte).is_none() && byte & 0x80 != 0
}

/// Computes the raw (unmasked) CRC32C covering `type_byte`, then the log
/// number (little-endian, only when recyclable records carry one), then
/// `fragment` — matching the reference log writer's `Extend(type_crc,
/// payload)` composition so a single bit flip anywhere in the frame,
/// including the type tag itself, is detected.
pub fn frame_crc(type_byte: u8, log_number: Option<u32>, fragment: &[u8]) -> u32 {
    let mut crc = crc32c::crc32c(&[type_byte]);
    if let Some(n) = log_number {
        crc = crc32c::crc32c_append(crc, &n.to_le_bytes());
    }
    crc32c::crc32c_append(crc, fragment)
}

/// Errors surfaced while parsing on-disk physical record framing.
///
/// These are the "strict" error kinds; in lenient mode the reader converts
/// every one of these into a single reporter notification followed by
/// logical EOF.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum WalError {
    /// I/O failure reading or writing the underlying sink.
    #[error("I/O error: {0}")]
    Io(String),

    /// Checksum over the physical record header/payload did not match.
    #[error("WAL record corrupted: {0}")]
    Corrupted(String),

    /// Fewer bytes were available than the declared record length.
    #[error("WAL record too short")]
    Short,

    /// A type byte that is neither a known code nor safe-to-ignore.
    #[error("invalid WAL record type {0:#04x}")]
    InvalidType(u8),

    /// A recyclable record's log number did not match the reader's
    /// expected log number — it belongs to a previous incarnation of a
    /// recycled file.
    #[error("old WAL record from log {0}")]
    OldRecord(u32),

    /// End of file reached while a fragmented record was still open.
    #[error("unexpected end of file inside a fragmented record")]
    UnexpectedEof,

    /// A `First` physical record arrived while already inside a record.
    #[error("unexpected First record")]
    UnexpectedFirst,

    /// A `Middle` physical record arrived outside of any open record.
    #[error("unexpected Middle record")]
    UnexpectedMiddle,

    /// A `Last` physical record arrived outside of any open record.
    #[error("unexpected Last record")]
    UnexpectedLast,

    /// A record (or single fragment) exceeded an enforced size limit.
    #[error("WAL record too large ({0} bytes)")]
    RecordTooLarge(usize),
}

impl From<std::io::Error> for WalError {
    fn from(e: std::io::Error) -> Self {
        WalError::Io(e.to_string())
    }
}
