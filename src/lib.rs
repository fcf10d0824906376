//! # rockcore
//!
//! The on-disk and in-memory **core** of a log-structured,
//! RocksDB-format-compatible key-value storage engine: byte-exact binary
//! encoding, the write-ahead log (WAL) record stream, the write-batch
//! atomic grouping format, a cache-local Bloom filter, a sharded block
//! cache, and a concurrent in-memory sorted map (memtable) with MVCC point
//! reads and range deletion.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      caller (engine)                        │
//! │   assembles a WriteBatch, assigns it a sequence number       │
//! └───────────────┬───────────────────────────┬─────────────────┘
//!                 │ serialize (encoding)       │
//!                 ▼                            │
//! ┌────────────────────────────┐               │
//! │            wal              │ append as one logical record  │
//! └───────────────┬─────────────┘              │
//!                 │ replay                      ▼
//!                 ▼                  ┌───────────────────────┐
//! ┌────────────────────────────┐     │       memtable         │
//! │        write_batch          │───▶│  (skip list, MVCC)    │
//! └────────────────────────────┘     └───────────┬───────────┘
//!                                                 │ miss
//!                                                 ▼
//!                                   external SST readers, which
//!                                   stage blocks in `cache` and
//!                                   consult `filter` to skip keys
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`encoding`] | Fixed-width and variable-length (varint/zigzag) binary coding, streaming cursor |
//! | [`checksum`] | CRC32C masking and XXH3/XXHash64 block-checksum composition |
//! | [`write_batch`] | Atomic group of record operations, shared wire format with the WAL payload |
//! | [`wal`] | Block-framed, CRC-verified append-only record stream (legacy + recyclable) |
//! | [`filter`] | Cache-local Bloom filter (FastLocalBloom) builder and reader |
//! | [`cache`] | Sharded LRU block cache with reference-counted pinning |
//! | [`memtable`] | Concurrent skip-list memtable with MVCC visibility and range tombstones |
//!
//! ## Out of scope
//!
//! The SST (sorted table) reader/writer, compaction scheduler, MANIFEST /
//! version-set bookkeeping, column-family manager, merge-operator plug-ins,
//! filesystem abstraction, and any CLI wrapper are external collaborators.
//! This crate assumes such collaborators consume the interfaces exposed
//! here; it does not implement them.
//!
//! ## Quick Start
//!
//! ```rust
//! use rockcore::write_batch::WriteBatch;
//! use rockcore::memtable::{Memtable, ValueType};
//!
//! let mut batch = WriteBatch::new();
//! batch.put(b"hello", b"world");
//! batch.delete(b"stale");
//!
//! let memtable = Memtable::new();
//! memtable.add(b"hello", 1, ValueType::Value, b"world");
//! let (value, found, deleted) = memtable.get(b"hello", 1);
//! assert_eq!(value.as_deref(), Some(b"world".as_slice()));
//! assert!(found && !deleted);
//! ```

#![allow(dead_code)]

pub mod cache;
pub mod checksum;
pub mod encoding;
pub mod filter;
pub mod memtable;
pub mod wal;
pub mod write_batch;
