//! WriteBatch Module
//!
//! This module implements the atomic write-grouping format shared by the
//! engine's mutation API and the WAL payload: a `WriteBatch` buffers one or
//! more record operations (puts, deletes, merges, range deletions, 2PC
//! markers, …) behind a single sequence number, then is serialized once as
//! the WAL's logical record.
//!
//! ## Design Overview
//!
//! The wire format is a fixed 12-byte header (`sequence:u64 LE`,
//! `count:u32 LE`) followed by zero or more tagged records. Each record
//! begins with a 1-byte tag (see [`tag`]) that selects its shape; most
//! carry a [length-prefixed](crate::encoding::append_length_prefixed) key
//! and/or value, with column-family variants inserting a
//! [varint32](crate::encoding::append_varint32) CF id immediately after the
//! tag.
//!
//! `count` must track only *sequence-consuming* operations (put, delete,
//! merge, single-delete, range-delete, …) — markers like `LogData` and the
//! 2PC no-op do not advance it. Getting this wrong corrupts MVCC ordering
//! on replay, since the engine assigns sequence numbers by adding `count`
//! to the batch's base sequence.
//!
//! Dispatch on replay goes through [`WriteBatchHandler`], one method per
//! record kind with a no-op default — a handler written before 2PC markers
//! existed keeps compiling and simply ignores them.
//!
//! A per-size-bucket [`BatchPool`] lets callers reuse batch buffers across
//! writes instead of allocating fresh `Vec<u8>`s on every write; see that
//! type's docs for the bucketing policy.

#[cfg(test)]
mod tests;

use std::sync::Mutex;

use thiserror::Error;

use crate::encoding::{
    self, append_length_prefixed, append_varint32, decode_length_prefixed, decode_varint32,
    encode_fixed32, encode_fixed64,
};

// ------------------------------------------------------------------------------------------------
// Error types
// ------------------------------------------------------------------------------------------------

/// Errors returned while constructing from or iterating a `WriteBatch`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum WriteBatchError {
    /// The buffer was smaller than the 12-byte header.
    #[error("buffer too small to be a write batch")]
    TooSmall,
    /// An unknown tag, truncated varint, or out-of-bounds length was found.
    #[error("corrupted write batch record")]
    Corrupted,
}

/// Convenience alias used throughout this module.
pub type Result<T> = std::result::Result<T, WriteBatchError>;

// ------------------------------------------------------------------------------------------------
// Record tags
// ------------------------------------------------------------------------------------------------

/// On-disk record tag constants.
///
/// Values are part of the persisted wire format; never renumber an
/// existing constant.
pub mod tag {
    pub const DELETION: u8 = 0x00;
    pub const VALUE: u8 = 0x01;
    pub const MERGE: u8 = 0x02;
    pub const LOG_DATA: u8 = 0x03;
    pub const CF_DELETION: u8 = 0x04;
    pub const CF_VALUE: u8 = 0x05;
    pub const CF_MERGE: u8 = 0x06;
    pub const SINGLE_DELETION: u8 = 0x07;
    pub const CF_SINGLE_DELETION: u8 = 0x08;
    pub const BEGIN_PREPARE_XID: u8 = 0x09;
    pub const END_PREPARE_XID: u8 = 0x0A;
    pub const COMMIT_XID: u8 = 0x0B;
    pub const ROLLBACK_XID: u8 = 0x0C;
    pub const NOOP: u8 = 0x0D;
    pub const CF_RANGE_DELETION: u8 = 0x0E;
    pub const RANGE_DELETION: u8 = 0x0F;
    pub const CF_BLOB_INDEX: u8 = 0x10;
    pub const BLOB_INDEX: u8 = 0x11;
    pub const BEGIN_PERSISTED_PREPARE_XID: u8 = 0x12;
    pub const BEGIN_UNPREPARE_XID: u8 = 0x13;
    pub const DELETION_WITH_TIMESTAMP: u8 = 0x14;
    pub const COMMIT_XID_AND_TIMESTAMP: u8 = 0x15;
    pub const WIDE_COLUMN_ENTITY: u8 = 0x16;
    pub const CF_WIDE_COLUMN_ENTITY: u8 = 0x17;
    pub const VALUE_PREFERRED_SEQNO: u8 = 0x18;
    pub const CF_VALUE_PREFERRED_SEQNO: u8 = 0x19;
}

/// Size of the fixed batch header: `sequence:u64 LE` + `count:u32 LE`.
pub const HEADER_SIZE: usize = 12;

// ------------------------------------------------------------------------------------------------
// WriteBatchHandler
// ------------------------------------------------------------------------------------------------

/// Callback interface dispatched to by [`WriteBatch::iterate`].
///
/// Every method defaults to a no-op success so a handler only needs to
/// override the record kinds it understands; a handler written before 2PC
/// markers existed keeps compiling unchanged when new marker kinds are
/// added.
pub trait WriteBatchHandler {
    /// `Put` on the default column family, or any column family when
    /// `cf == 0` (the non-cf tag is used for cf 0 on the wire).
    fn put(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        let _ = (cf, key, value);
        Ok(())
    }

    /// `Delete`.
    fn delete(&mut self, cf: u32, key: &[u8]) -> Result<()> {
        let _ = (cf, key);
        Ok(())
    }

    /// `SingleDelete`.
    fn single_delete(&mut self, cf: u32, key: &[u8]) -> Result<()> {
        let _ = (cf, key);
        Ok(())
    }

    /// `Merge`.
    fn merge(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        let _ = (cf, key, value);
        Ok(())
    }

    /// `DeleteRange`.
    fn delete_range(&mut self, cf: u32, start: &[u8], end: &[u8]) -> Result<()> {
        let _ = (cf, start, end);
        Ok(())
    }

    /// Out-of-band blob attached to the batch; does not consume a sequence.
    fn log_data(&mut self, blob: &[u8]) -> Result<()> {
        let _ = blob;
        Ok(())
    }

    /// `BlobIndex`: a point write whose value is an opaque reference into
    /// external blob storage rather than the value itself.
    fn blob_index(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        let _ = (cf, key, value);
        Ok(())
    }

    /// `DeletionWithTimestamp`: a `Delete` whose key already carries a
    /// trailing user-defined timestamp.
    fn deletion_with_timestamp(&mut self, key: &[u8]) -> Result<()> {
        let _ = key;
        Ok(())
    }

    /// `WideColumnEntity`: a point write whose value is an opaquely encoded
    /// multi-column entity rather than a single value blob.
    fn wide_column_entity(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        let _ = (cf, key, value);
        Ok(())
    }

    /// `ValuePreferredSeqno`: a `Put` that additionally carries a preferred
    /// sequence number for the engine to try to assign on replay.
    fn put_with_preferred_seqno(
        &mut self,
        cf: u32,
        key: &[u8],
        value: &[u8],
        preferred_seqno: u64,
    ) -> Result<()> {
        let _ = (cf, key, value, preferred_seqno);
        Ok(())
    }

    /// 2PC: begin prepare phase for `xid`.
    fn mark_begin_prepare(&mut self, xid: &[u8]) -> Result<()> {
        let _ = xid;
        Ok(())
    }

    /// 2PC: end prepare phase for `xid`.
    fn mark_end_prepare(&mut self, xid: &[u8]) -> Result<()> {
        let _ = xid;
        Ok(())
    }

    /// 2PC: commit `xid`, optionally carrying a commit timestamp.
    fn mark_commit(&mut self, xid: &[u8], commit_timestamp: Option<u64>) -> Result<()> {
        let _ = (xid, commit_timestamp);
        Ok(())
    }

    /// 2PC: roll back `xid`.
    fn mark_rollback(&mut self, xid: &[u8]) -> Result<()> {
        let _ = xid;
        Ok(())
    }

    /// 2PC: no-op marker.
    fn mark_noop(&mut self) -> Result<()> {
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// WriteBatch
// ------------------------------------------------------------------------------------------------

/// An atomic group of record operations sharing one sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    buf: Vec<u8>,
}

impl Default for WriteBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl WriteBatch {
    /// Creates an empty batch: header-only buffer, sequence 0, count 0.
    pub fn new() -> Self {
        let mut buf = vec![0u8; HEADER_SIZE];
        encode_fixed64(&mut buf[0..8], 0);
        encode_fixed32(&mut buf[8..12], 0);
        Self { buf }
    }

    /// Reconstructs a batch from an existing serialized buffer.
    ///
    /// Only the header is validated eagerly; malformed record bodies
    /// surface when [`Self::iterate`] reaches them.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(WriteBatchError::TooSmall);
        }
        Ok(Self {
            buf: bytes.to_vec(),
        })
    }

    /// Raw serialized bytes: header followed by the record stream.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    /// Total size in bytes, including the header.
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Returns the batch's base sequence number.
    pub fn sequence(&self) -> u64 {
        encoding::decode_fixed64(&self.buf[0..8])
    }

    /// Sets the batch's base sequence number.
    pub fn set_sequence(&mut self, seq: u64) {
        encode_fixed64(&mut self.buf[0..8], seq);
    }

    /// Returns the number of sequence-consuming operations recorded.
    pub fn count(&self) -> u32 {
        encoding::decode_fixed32(&self.buf[8..12])
    }

    fn set_count(&mut self, count: u32) {
        encode_fixed32(&mut self.buf[8..12], count);
    }

    fn bump_count(&mut self) {
        let c = self.count();
        self.set_count(c + 1);
    }

    /// Discards all records; resets sequence to 0 and count to 0.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.buf.resize(HEADER_SIZE, 0);
    }

    /// Appends `other`'s record stream to `self`. `other`'s own sequence is
    /// ignored; counts add.
    pub fn append(&mut self, other: &WriteBatch) {
        self.buf.extend_from_slice(&other.buf[HEADER_SIZE..]);
        let total = self.count() + other.count();
        self.set_count(total);
    }

    // -- mutators --------------------------------------------------------

    fn put_tagged(&mut self, cf: u32, key: &[u8], value: &[u8]) {
        if cf == 0 {
            self.buf.push(tag::VALUE);
        } else {
            self.buf.push(tag::CF_VALUE);
            append_varint32(&mut self.buf, cf);
        }
        append_length_prefixed(&mut self.buf, key);
        append_length_prefixed(&mut self.buf, value);
        self.bump_count();
    }

    /// Records a `Put` on the default column family.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.put_tagged(0, key, value);
    }

    /// Records a `Put` on column family `cf`.
    pub fn put_cf(&mut self, cf: u32, key: &[u8], value: &[u8]) {
        self.put_tagged(cf, key, value);
    }

    fn delete_tagged(&mut self, cf: u32, key: &[u8]) {
        if cf == 0 {
            self.buf.push(tag::DELETION);
        } else {
            self.buf.push(tag::CF_DELETION);
            append_varint32(&mut self.buf, cf);
        }
        append_length_prefixed(&mut self.buf, key);
        self.bump_count();
    }

    /// Records a `Delete` on the default column family.
    pub fn delete(&mut self, key: &[u8]) {
        self.delete_tagged(0, key);
    }

    /// Records a `Delete` on column family `cf`.
    pub fn delete_cf(&mut self, cf: u32, key: &[u8]) {
        self.delete_tagged(cf, key);
    }

    fn single_delete_tagged(&mut self, cf: u32, key: &[u8]) {
        if cf == 0 {
            self.buf.push(tag::SINGLE_DELETION);
        } else {
            self.buf.push(tag::CF_SINGLE_DELETION);
            append_varint32(&mut self.buf, cf);
        }
        append_length_prefixed(&mut self.buf, key);
        self.bump_count();
    }

    /// Records a `SingleDelete` on the default column family.
    pub fn single_delete(&mut self, key: &[u8]) {
        self.single_delete_tagged(0, key);
    }

    /// Records a `SingleDelete` on column family `cf`.
    pub fn single_delete_cf(&mut self, cf: u32, key: &[u8]) {
        self.single_delete_tagged(cf, key);
    }

    fn merge_tagged(&mut self, cf: u32, key: &[u8], value: &[u8]) {
        if cf == 0 {
            self.buf.push(tag::MERGE);
        } else {
            self.buf.push(tag::CF_MERGE);
            append_varint32(&mut self.buf, cf);
        }
        append_length_prefixed(&mut self.buf, key);
        append_length_prefixed(&mut self.buf, value);
        self.bump_count();
    }

    /// Records a `Merge` on the default column family.
    pub fn merge(&mut self, key: &[u8], value: &[u8]) {
        self.merge_tagged(0, key, value);
    }

    /// Records a `Merge` on column family `cf`.
    pub fn merge_cf(&mut self, cf: u32, key: &[u8], value: &[u8]) {
        self.merge_tagged(cf, key, value);
    }

    fn delete_range_tagged(&mut self, cf: u32, start: &[u8], end: &[u8]) {
        if cf == 0 {
            self.buf.push(tag::RANGE_DELETION);
        } else {
            self.buf.push(tag::CF_RANGE_DELETION);
            append_varint32(&mut self.buf, cf);
        }
        append_length_prefixed(&mut self.buf, start);
        append_length_prefixed(&mut self.buf, end);
        self.bump_count();
    }

    /// Records a `DeleteRange` covering `[start, end)` on the default
    /// column family.
    pub fn delete_range(&mut self, start: &[u8], end: &[u8]) {
        self.delete_range_tagged(0, start, end);
    }

    /// Records a `DeleteRange` on column family `cf`.
    pub fn delete_range_cf(&mut self, cf: u32, start: &[u8], end: &[u8]) {
        self.delete_range_tagged(cf, start, end);
    }

    /// Attaches an out-of-band blob that does not consume a sequence.
    pub fn put_log_data(&mut self, blob: &[u8]) {
        self.buf.push(tag::LOG_DATA);
        append_length_prefixed(&mut self.buf, blob);
    }

    /// 2PC: marks the beginning of the prepare phase for `xid`.
    pub fn mark_begin_prepare(&mut self, xid: &[u8]) {
        self.buf.push(tag::BEGIN_PREPARE_XID);
        append_length_prefixed(&mut self.buf, xid);
    }

    /// 2PC: marks the end of the prepare phase for `xid`.
    pub fn mark_end_prepare(&mut self, xid: &[u8]) {
        self.buf.push(tag::END_PREPARE_XID);
        append_length_prefixed(&mut self.buf, xid);
    }

    /// 2PC: marks `xid` as committed.
    pub fn mark_commit(&mut self, xid: &[u8]) {
        self.buf.push(tag::COMMIT_XID);
        append_length_prefixed(&mut self.buf, xid);
    }

    /// 2PC: marks `xid` as committed, carrying an 8-byte commit timestamp.
    pub fn mark_commit_with_timestamp(&mut self, xid: &[u8], commit_timestamp: u64) {
        self.buf.push(tag::COMMIT_XID_AND_TIMESTAMP);
        append_length_prefixed(&mut self.buf, xid);
        let mut ts = [0u8; 8];
        encode_fixed64(&mut ts, commit_timestamp);
        self.buf.extend_from_slice(&ts);
    }

    /// 2PC: marks `xid` as rolled back.
    pub fn mark_rollback(&mut self, xid: &[u8]) {
        self.buf.push(tag::ROLLBACK_XID);
        append_length_prefixed(&mut self.buf, xid);
    }

    // -- scan-based accessors --------------------------------------------

    /// Returns `true` if any `Put`/CF-`Put` record is present.
    pub fn has_put(&self) -> bool {
        self.has_any(&[tag::VALUE, tag::CF_VALUE])
    }

    /// Returns `true` if any `Delete`/CF-`Delete` record is present.
    pub fn has_delete(&self) -> bool {
        self.has_any(&[tag::DELETION, tag::CF_DELETION])
    }

    /// Returns `true` if any `SingleDelete`/CF-`SingleDelete` record is present.
    pub fn has_single_delete(&self) -> bool {
        self.has_any(&[tag::SINGLE_DELETION, tag::CF_SINGLE_DELETION])
    }

    /// Returns `true` if any `Merge`/CF-`Merge` record is present.
    pub fn has_merge(&self) -> bool {
        self.has_any(&[tag::MERGE, tag::CF_MERGE])
    }

    /// Returns `true` if any `DeleteRange`/CF-`DeleteRange` record is present.
    pub fn has_delete_range(&self) -> bool {
        self.has_any(&[tag::RANGE_DELETION, tag::CF_RANGE_DELETION])
    }

    /// Returns `true` if any 2PC marker (begin/end prepare, commit,
    /// rollback, noop) is present.
    pub fn has_2pc_marker(&self) -> bool {
        struct Probe(bool);
        impl WriteBatchHandler for Probe {
            fn mark_begin_prepare(&mut self, _xid: &[u8]) -> Result<()> {
                self.0 = true;
                Ok(())
            }
            fn mark_end_prepare(&mut self, _xid: &[u8]) -> Result<()> {
                self.0 = true;
                Ok(())
            }
            fn mark_commit(&mut self, _xid: &[u8], _ts: Option<u64>) -> Result<()> {
                self.0 = true;
                Ok(())
            }
            fn mark_rollback(&mut self, _xid: &[u8]) -> Result<()> {
                self.0 = true;
                Ok(())
            }
            fn mark_noop(&mut self) -> Result<()> {
                self.0 = true;
                Ok(())
            }
        }
        let mut probe = Probe(false);
        let _ = self.iterate(&mut probe);
        probe.0
    }

    fn has_any(&self, tags: &[u8]) -> bool {
        let mut hit = false;
        let _ = self.iterate(&mut TagProbe { tags, hit: &mut hit });
        hit
    }

    /// Walks the record stream, dispatching each record to `handler`.
    /// Stops on the first handler error.
    pub fn iterate<H: WriteBatchHandler>(&self, handler: &mut H) -> Result<()> {
        let body = &self.buf[HEADER_SIZE..];
        let mut pos = 0usize;

        while pos < body.len() {
            let t = body[pos];
            pos += 1;

            macro_rules! cf_id {
                () => {{
                    let (cf, n) =
                        decode_varint32(&body[pos..]).map_err(|_| WriteBatchError::Corrupted)?;
                    pos += n;
                    cf
                }};
            }

            macro_rules! lp {
                () => {{
                    let (slice, n) = decode_length_prefixed(&body[pos..])
                        .map_err(|_| WriteBatchError::Corrupted)?;
                    pos += n;
                    slice
                }};
            }

            match t {
                tag::VALUE => {
                    let key = lp!();
                    let value = lp!();
                    handler.put(0, key, value)?;
                }
                tag::CF_VALUE => {
                    let cf = cf_id!();
                    let key = lp!();
                    let value = lp!();
                    handler.put(cf, key, value)?;
                }
                tag::DELETION => {
                    let key = lp!();
                    handler.delete(0, key)?;
                }
                tag::CF_DELETION => {
                    let cf = cf_id!();
                    let key = lp!();
                    handler.delete(cf, key)?;
                }
                tag::SINGLE_DELETION => {
                    let key = lp!();
                    handler.single_delete(0, key)?;
                }
                tag::CF_SINGLE_DELETION => {
                    let cf = cf_id!();
                    let key = lp!();
                    handler.single_delete(cf, key)?;
                }
                tag::MERGE => {
                    let key = lp!();
                    let value = lp!();
                    handler.merge(0, key, value)?;
                }
                tag::CF_MERGE => {
                    let cf = cf_id!();
                    let key = lp!();
                    let value = lp!();
                    handler.merge(cf, key, value)?;
                }
                tag::RANGE_DELETION => {
                    let start = lp!();
                    let end = lp!();
                    handler.delete_range(0, start, end)?;
                }
                tag::CF_RANGE_DELETION => {
                    let cf = cf_id!();
                    let start = lp!();
                    let end = lp!();
                    handler.delete_range(cf, start, end)?;
                }
                tag::LOG_DATA => {
                    let blob = lp!();
                    handler.log_data(blob)?;
                }
                tag::BEGIN_PREPARE_XID
                | tag::BEGIN_PERSISTED_PREPARE_XID
                | tag::BEGIN_UNPREPARE_XID => {
                    let xid = lp!();
                    handler.mark_begin_prepare(xid)?;
                }
                tag::END_PREPARE_XID => {
                    let xid = lp!();
                    handler.mark_end_prepare(xid)?;
                }
                tag::COMMIT_XID => {
                    let xid = lp!();
                    handler.mark_commit(xid, None)?;
                }
                tag::COMMIT_XID_AND_TIMESTAMP => {
                    let xid = lp!();
                    if body.len() < pos + 8 {
                        return Err(WriteBatchError::Corrupted);
                    }
                    let ts = encoding::decode_fixed64(&body[pos..pos + 8]);
                    pos += 8;
                    handler.mark_commit(xid, Some(ts))?;
                }
                tag::ROLLBACK_XID => {
                    let xid = lp!();
                    handler.mark_rollback(xid)?;
                }
                tag::NOOP => {
                    handler.mark_noop()?;
                }
                tag::BLOB_INDEX => {
                    let key = lp!();
                    let value = lp!();
                    handler.blob_index(0, key, value)?;
                }
                tag::CF_BLOB_INDEX => {
                    let cf = cf_id!();
                    let key = lp!();
                    let value = lp!();
                    handler.blob_index(cf, key, value)?;
                }
                tag::DELETION_WITH_TIMESTAMP => {
                    let key = lp!();
                    handler.deletion_with_timestamp(key)?;
                }
                tag::WIDE_COLUMN_ENTITY => {
                    let key = lp!();
                    let value = lp!();
                    handler.wide_column_entity(0, key, value)?;
                }
                tag::CF_WIDE_COLUMN_ENTITY => {
                    let cf = cf_id!();
                    let key = lp!();
                    let value = lp!();
                    handler.wide_column_entity(cf, key, value)?;
                }
                tag::VALUE_PREFERRED_SEQNO => {
                    let key = lp!();
                    let value = lp!();
                    if body.len() < pos + 8 {
                        return Err(WriteBatchError::Corrupted);
                    }
                    let seqno = encoding::decode_fixed64(&body[pos..pos + 8]);
                    pos += 8;
                    handler.put_with_preferred_seqno(0, key, value, seqno)?;
                }
                tag::CF_VALUE_PREFERRED_SEQNO => {
                    let cf = cf_id!();
                    let key = lp!();
                    let value = lp!();
                    if body.len() < pos + 8 {
                        return Err(WriteBatchError::Corrupted);
                    }
                    let seqno = encoding::decode_fixed64(&body[pos..pos + 8]);
                    pos += 8;
                    handler.put_with_preferred_seqno(cf, key, value, seqno)?;
                }
                _ => return Err(WriteBatchError::Corrupted),
            }
        }

        Ok(())
    }
}

struct TagProbe<'a> {
    tags: &'a [u8],
    hit: &'a mut bool,
}

impl WriteBatchHandler for TagProbe<'_> {
    fn put(&mut self, cf: u32, _key: &[u8], _value: &[u8]) -> Result<()> {
        let t = if cf == 0 { tag::VALUE } else { tag::CF_VALUE };
        if self.tags.contains(&t) {
            *self.hit = true;
        }
        Ok(())
    }
    fn delete(&mut self, cf: u32, _key: &[u8]) -> Result<()> {
        let t = if cf == 0 { tag::DELETION } else { tag::CF_DELETION };
        if self.tags.contains(&t) {
            *self.hit = true;
        }
        Ok(())
    }
    fn single_delete(&mut self, cf: u32, _key: &[u8]) -> Result<()> {
        let t = if cf == 0 {
            tag::SINGLE_DELETION
        } else {
            tag::CF_SINGLE_DELETION
        };
        if self.tags.contains(&t) {
            *self.hit = true;
        }
        Ok(())
    }
    fn merge(&mut self, cf: u32, _key: &[u8], _value: &[u8]) -> Result<()> {
        let t = if cf == 0 { tag::MERGE } else { tag::CF_MERGE };
        if self.tags.contains(&t) {
            *self.hit = true;
        }
        Ok(())
    }
    fn delete_range(&mut self, cf: u32, _start: &[u8], _end: &[u8]) -> Result<()> {
        let t = if cf == 0 {
            tag::RANGE_DELETION
        } else {
            tag::CF_RANGE_DELETION
        };
        if self.tags.contains(&t) {
            *self.hit = true;
        }
        Ok(())
    }
}

// ------------------------------------------------------------------------------------------------
// BatchPool
// ------------------------------------------------------------------------------------------------

/// Size buckets (capacity hints, in bytes) that [`BatchPool`] recycles
/// batches into. A batch whose buffer exceeds [`BatchPool::MAX_POOLED_SIZE`]
/// is dropped instead of returned, so one unusually large write cannot pin
/// an oversized buffer in the pool indefinitely.
const BUCKET_SIZES: [usize; 5] = [4 * 1024, 16 * 1024, 64 * 1024, 256 * 1024, 1024 * 1024];

/// A striped pool of reusable [`WriteBatch`] buffers.
///
/// Each bucket is guarded by its own `Mutex<Vec<WriteBatch>>`, matching the
/// sharded/striped locking convention used elsewhere in this crate (the
/// block cache shards the same way): contention on one bucket never blocks
/// callers reusing a different size class.
pub struct BatchPool {
    buckets: [Mutex<Vec<WriteBatch>>; 5],
}

impl Default for BatchPool {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchPool {
    /// Batches whose buffer is larger than this are never returned to the
    /// pool (4 MiB).
    pub const MAX_POOLED_SIZE: usize = 4 * 1024 * 1024;

    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
        }
    }

    fn bucket_for(size: usize) -> Option<usize> {
        BUCKET_SIZES.iter().position(|&cap| size <= cap)
    }

    /// Takes a cleared batch from the pool, preferring one sized for
    /// `size_hint`; allocates a fresh one if the pool is empty.
    pub fn get(&self, size_hint: usize) -> WriteBatch {
        if let Some(idx) = Self::bucket_for(size_hint) {
            for bucket_idx in idx..BUCKET_SIZES.len() {
                let mut bucket = self.buckets[bucket_idx].lock().unwrap();
                if let Some(mut batch) = bucket.pop() {
                    batch.clear();
                    return batch;
                }
            }
        }
        let mut batch = WriteBatch::new();
        batch.buf.reserve(size_hint);
        batch
    }

    /// Returns `batch` to the pool for reuse, unless it exceeds
    /// [`Self::MAX_POOLED_SIZE`].
    pub fn put(&self, batch: WriteBatch) {
        let size = batch.size();
        if size > Self::MAX_POOLED_SIZE {
            return;
        }
        if let Some(idx) = Self::bucket_for(size) {
            self.buckets[idx].lock().unwrap().push(batch);
        }
    }
}
