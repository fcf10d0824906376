//! Write-Ahead Logging (WAL) Module
//!
//! This module implements the block-framed, append-only record stream used
//! to durably persist a serialized [`crate::write_batch::WriteBatch`]
//! before it is applied to a memtable.
//!
//! ## Design Overview
//!
//! Records are split into physical fragments that never cross a 32 KiB
//! block boundary. Each fragment carries its own masked CRC32C (see
//! [`crate::checksum`]) covering the fragment's type tag, an optional log
//! number (recyclable files only), and its payload — so a corrupted
//! fragment is detected independently of its neighbors.
//!
//! ```text
//! [CRC32C_LE(4)][length_LE(2)][type(1)][log_number_LE(4) if recyclable][payload]
//! ```
//!
//! A logical record that does not fit in the remainder of the current
//! block is split into `First`, zero or more `Middle`, and one `Last`
//! fragment; one that fits entirely is written as a single `Full`
//! fragment. When the remaining space in a block is too small even for a
//! header, the writer zero-fills the rest of the block and continues in
//! the next one — the reader recognizes this padding and skips it.
//!
//! Three additional record types carry stream-level metadata rather than
//! payload fragments: `SetCompression`, `UserDefinedTimestampSize`, and
//! `PredecessorWalInfo`. They are never fragmented.
//!
//! ## Reader modes
//!
//! [`ReaderMode::Lenient`] is the WAL-recovery default: any corruption
//! (bad checksum, an orphaned fragment, truncated file) is reported once
//! through a [`Reporter`] and the reader then behaves as though the
//! stream ended there, since a torn write at the tail of the most recent
//! segment is an expected, non-fatal event. [`ReaderMode::Strict`] treats
//! the same conditions as fatal and returns the error immediately,
//! matching how a MANIFEST-style stream (which should never have a torn
//! tail) is consumed.
//!
//! ## Concurrency model
//!
//! [`WalWriter`] wraps its file in `Arc<Mutex<File>>`, this crate's
//! established convention for sharing a file handle safely across
//! threads. [`WalReader`] is generic over any [`std::io::Read`] so tests
//! can exercise the state machine over an in-memory buffer without
//! touching the filesystem.

pub mod format;
mod reader;
mod writer;

#[cfg(test)]
mod tests;

pub use format::{RecordType, WalError, BLOCK_SIZE, LEGACY_HEADER_SIZE, RECYCLABLE_HEADER_SIZE};
pub use reader::{ReaderMode, Reporter, WalReader, WalRecord};
pub use writer::WalWriter;
