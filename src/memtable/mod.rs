//! In-memory write buffer: a concurrent, MVCC-ordered index of recent
//! writes that backs point lookups and range scans before they are
//! flushed to an on-disk table.
//!
//! # Design Overview
//!
//! Entries are keyed by [`InternalKey`] inside a [`crossbeam_skiplist::SkipMap`],
//! which gives lock-free, wait-free reads concurrent with inserts — exactly
//! the access pattern a memtable sees (many readers, one writer thread at a
//! time serialized upstream by a write lock). Because `InternalKey`'s `Ord`
//! impl sorts ascending by user key and *descending* by `(sequence, type)`
//! trailer, a `range()` scan seeded with a synthetic lookup key naturally
//! visits the newest write for a key before older ones, which is exactly
//! what snapshot reads need.
//!
//! Range deletions (`DeleteRange`) do not fit the skip list's point-key
//! model, so they are tracked separately in a `Mutex<Vec<RangeTombstone>>`
//! and consulted on every lookup; see [`tombstone::fragment`] for how
//! overlapping tombstones are reconciled once a memtable is sealed.
//!
//! ---------------------------------------------------------------------
//! Concurrency
//! ---------------------------------------------------------------------
//!
//! `insert_lock` serializes writers so that `num_entries`/`memory_usage`/
//! `min_seq`/`max_seq` update atomically with the skip list insert; readers
//! never take it. `SkipMap` nodes are immortal until the whole table is
//! dropped, so an iterator born from one thread stays valid even if another
//! thread inserts or the table is later marked immutable.

mod key;
mod tombstone;

#[cfg(test)]
mod tests;

pub use key::{decode_payload, encode_payload, InternalKey, ValueType};
pub use tombstone::{fragment, RangeTombstone, RangeTombstoneFragment};

use std::collections::Bound;
use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Mutex;

use crossbeam_skiplist::SkipMap;
use tracing::trace;

/// Per-entry bookkeeping overhead assumed for `memory_usage`, matching the
/// approximate skip-list node overhead the size budget is calibrated
/// against (tower pointers plus allocator slack).
const ENTRY_OVERHEAD_BYTES: usize = 32;

/// A concurrent, sequence-number-ordered write buffer.
pub struct Memtable {
    table: SkipMap<InternalKey, Vec<u8>>,
    range_tombstones: Mutex<Vec<RangeTombstone>>,
    insert_lock: Mutex<()>,
    num_entries: AtomicU64,
    memory_usage: AtomicU64,
    min_seq: AtomicU64,
    max_seq: AtomicU64,
    refs: AtomicI64,
    next_log_number: AtomicU32,
}

impl Default for Memtable {
    fn default() -> Self {
        Self::new()
    }
}

impl Memtable {
    pub fn new() -> Self {
        Self {
            table: SkipMap::new(),
            range_tombstones: Mutex::new(Vec::new()),
            insert_lock: Mutex::new(()),
            num_entries: AtomicU64::new(0),
            memory_usage: AtomicU64::new(0),
            min_seq: AtomicU64::new(u64::MAX),
            max_seq: AtomicU64::new(0),
            refs: AtomicI64::new(1),
            next_log_number: AtomicU32::new(0),
        }
    }

    /// Records a point write (`Put`, `Merge`, `Delete`, or `SingleDelete`).
    pub fn add(&self, user_key: &[u8], sequence: u64, value_type: ValueType, value: &[u8]) {
        let _guard = self.insert_lock.lock().unwrap();
        let ikey = InternalKey::new(user_key, sequence, value_type);
        let payload = encode_payload(value);
        let added = (ikey.as_bytes().len() + payload.len() + ENTRY_OVERHEAD_BYTES) as u64;
        self.table.insert(ikey, payload);
        self.num_entries.fetch_add(1, AtomicOrdering::Relaxed);
        self.memory_usage.fetch_add(added, AtomicOrdering::Relaxed);
        self.bump_seq_range(sequence);
        trace!(sequence, value_type = ?value_type, "memtable add");
    }

    /// Records a `DeleteRange(seq, [start, end))`.
    pub fn add_range_tombstone(&self, sequence: u64, start: &[u8], end: &[u8]) {
        let mut tombstones = self.range_tombstones.lock().unwrap();
        tombstones.push(RangeTombstone {
            seq: sequence,
            start: start.to_vec(),
            end: end.to_vec(),
        });
        self.bump_seq_range(sequence);
    }

    fn bump_seq_range(&self, sequence: u64) {
        self.min_seq.fetch_min(sequence, AtomicOrdering::Relaxed);
        self.max_seq.fetch_max(sequence, AtomicOrdering::Relaxed);
    }

    /// Looks up `user_key` as of `read_seq`.
    ///
    /// Returns `(value, found, deleted)`: `found` is `true` whenever some
    /// entry (direct or tombstone) resolved the lookup at all, regardless
    /// of whether that resolution is a live value or a deletion. `deleted`
    /// is `true` when the resolving entry is a deletion (point or range);
    /// `value` then carries no payload. A `Merge` entry resolves as
    /// `(Some(operand), true, false)` — the caller is responsible for
    /// walking further back (via [`Memtable::collect_merge_operands`] or
    /// an on-disk table) to find the base value to merge onto.
    pub fn get(&self, user_key: &[u8], read_seq: u64) -> (Option<Vec<u8>>, bool, bool) {
        let lookup = InternalKey::new_lookup(user_key, read_seq);
        let range_del_seq = self.max_covering_tombstone_seq(user_key, read_seq);

        let entry = self.table.range(lookup..).next();
        let resolved = entry
            .as_ref()
            .filter(|e| e.key().user_key() == user_key && e.key().sequence() <= read_seq);

        let Some(entry) = resolved else {
            return match range_del_seq {
                Some(_) => (None, true, true),
                None => (None, false, false),
            };
        };
        let seq = entry.key().sequence();

        if let Some(tombstone_seq) = range_del_seq {
            if tombstone_seq > seq {
                return (None, true, true);
            }
        }

        match entry.key().value_type() {
            Some(ValueType::Value) => (Some(decode_payload(entry.value())), true, false),
            Some(ValueType::Deletion) | Some(ValueType::SingleDeletion) => (None, true, true),
            Some(ValueType::Merge) => (Some(decode_payload(entry.value())), true, false),
            None => (None, false, false),
        }
    }

    /// Collects consecutive `Merge` operands for `user_key` at or below
    /// `read_seq`, newest first, stopping at (and including, for
    /// deletions) the entry that terminates the merge chain.
    ///
    /// Returns the operand list plus the terminal entry's resolved base
    /// value, if the chain terminated inside this memtable.
    pub fn collect_merge_operands(
        &self,
        user_key: &[u8],
        read_seq: u64,
    ) -> (Vec<Vec<u8>>, Option<Vec<u8>>) {
        let lookup = InternalKey::new_lookup(user_key, read_seq);
        let range_del_seq = self.max_covering_tombstone_seq(user_key, read_seq);
        let mut operands = Vec::new();

        for entry in self.table.range(lookup..) {
            if entry.key().user_key() != user_key {
                break;
            }
            let seq = entry.key().sequence();
            if seq > read_seq {
                continue;
            }
            if let Some(tombstone_seq) = range_del_seq {
                if tombstone_seq > seq {
                    return (operands, None);
                }
            }
            match entry.key().value_type() {
                Some(ValueType::Merge) => operands.push(decode_payload(entry.value())),
                Some(ValueType::Value) => {
                    return (operands, Some(decode_payload(entry.value())))
                }
                Some(ValueType::Deletion) | Some(ValueType::SingleDeletion) => {
                    return (operands, None)
                }
                None => break,
            }
        }
        (operands, None)
    }

    /// Highest sequence number of a range tombstone covering `user_key` at
    /// or below `read_seq`, if any. `O(tombstones)`; the sweep is expected
    /// to run over the small, already-fragmented set produced by
    /// [`tombstone::fragment`] rather than a raw, unbounded log of deletes.
    fn max_covering_tombstone_seq(&self, user_key: &[u8], read_seq: u64) -> Option<u64> {
        let tombstones = self.range_tombstones.lock().unwrap();
        tombstones
            .iter()
            .filter(|t| t.seq <= read_seq && t.start.as_slice() <= user_key && user_key < t.end.as_slice())
            .map(|t| t.seq)
            .max()
    }

    /// Collapses the recorded tombstones into non-overlapping fragments,
    /// each stamped with the highest covering sequence number. Intended to
    /// be called once a memtable is sealed, ahead of flushing it to an
    /// on-disk table.
    pub fn fragmented_tombstones(&self) -> Vec<RangeTombstoneFragment> {
        let tombstones = self.range_tombstones.lock().unwrap();
        fragment(&tombstones)
    }

    pub fn num_entries(&self) -> u64 {
        self.num_entries.load(AtomicOrdering::Relaxed)
    }

    pub fn memory_usage(&self) -> u64 {
        self.memory_usage.load(AtomicOrdering::Relaxed)
    }

    /// Lowest sequence number recorded, or `None` if the memtable is empty.
    pub fn min_seq(&self) -> Option<u64> {
        match self.min_seq.load(AtomicOrdering::Relaxed) {
            u64::MAX => None,
            v => Some(v),
        }
    }

    pub fn max_seq(&self) -> Option<u64> {
        match self.max_seq.load(AtomicOrdering::Relaxed) {
            0 if self.num_entries() == 0 => None,
            v => Some(v),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries() == 0
    }

    /// Increments the reference count kept by owners outside the memtable
    /// list (e.g. an in-flight iterator over a memtable that has since been
    /// superseded), returning the new count.
    pub fn ref_(&self) -> i64 {
        self.refs.fetch_add(1, AtomicOrdering::AcqRel) + 1
    }

    /// Decrements the reference count, returning the new count. A memtable
    /// is safe to reclaim once this reaches zero.
    pub fn unref(&self) -> i64 {
        self.refs.fetch_sub(1, AtomicOrdering::AcqRel) - 1
    }

    pub fn refs(&self) -> i64 {
        self.refs.load(AtomicOrdering::Acquire)
    }

    /// The WAL log number new writes to this memtable should be attributed
    /// to, for recovery bookkeeping.
    pub fn next_log_number(&self) -> u32 {
        self.next_log_number.load(AtomicOrdering::Relaxed)
    }

    pub fn set_next_log_number(&self, log_number: u32) {
        self.next_log_number.store(log_number, AtomicOrdering::Relaxed);
    }

    /// Returns an iterator positioned before the first entry.
    pub fn iter(&self) -> MemtableIterator<'_> {
        MemtableIterator {
            table: &self.table,
            current: None,
        }
    }
}

/// A bidirectional iterator over a memtable's internal keys, newest version
/// first for a given user key (matching `InternalKey`'s descending-trailer
/// ordering).
pub struct MemtableIterator<'a> {
    table: &'a SkipMap<InternalKey, Vec<u8>>,
    current: Option<crossbeam_skiplist::map::Entry<'a, InternalKey, Vec<u8>>>,
}

impl<'a> MemtableIterator<'a> {
    pub fn seek_to_first(&mut self) {
        self.current = self.table.front();
    }

    pub fn seek_to_last(&mut self) {
        self.current = self.table.back();
    }

    /// Positions at the first entry `>= target`.
    pub fn seek(&mut self, target: &InternalKey) {
        self.current = self
            .table
            .range((Bound::Included(target.clone()), Bound::Unbounded))
            .next();
    }

    /// Positions at the last entry `<= target`.
    pub fn seek_for_prev(&mut self, target: &InternalKey) {
        self.current = self
            .table
            .range((Bound::Unbounded, Bound::Included(target.clone())))
            .next_back();
    }

    pub fn next(&mut self) {
        self.current = self.current.take().and_then(|e| e.next());
    }

    pub fn prev(&mut self) {
        self.current = self.current.take().and_then(|e| e.prev());
    }

    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    pub fn key(&self) -> &InternalKey {
        self.current.as_ref().expect("iterator not valid").key()
    }

    pub fn value(&self) -> Vec<u8> {
        decode_payload(self.current.as_ref().expect("iterator not valid").value())
    }
}
