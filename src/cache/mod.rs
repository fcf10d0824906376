//! A sharded, reference-counted LRU block cache.
//!
//! # Design Overview
//!
//! Each shard is an index-based slab holding a doubly linked recency
//! list alongside a `HashMap` lookup index — the classic LevelDB/RocksDB
//! `LRUCache` shape, expressed without `unsafe` by storing links as slot
//! indices rather than raw pointers. A [`CacheHandle`] pins its entry
//! (ref count ≥ 1) for as long as it lives and releases the pin on
//! `Drop`, so callers never need to remember to call `release` — though
//! [`CacheHandle::release`] is available to drop a handle early and
//! explicitly, matching the reference cache's `Release` operation.
//!
//! Sharding distributes contention across `num_shards` independent
//! mutexes; shard selection XORs the file number with a golden-ratio
//! multiple of the block offset, so keys from the same file spread
//! across shards instead of clustering on one.


use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

/// Identifies a cached block: the SST file it came from and its byte
/// offset within that file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub file_number: u64,
    pub block_offset: u64,
}

impl CacheKey {
    pub fn new(file_number: u64, block_offset: u64) -> Self {
        Self {
            file_number,
            block_offset,
        }
    }
}

const SHARD_MULTIPLIER: u64 = 0x9E37_79B9;

struct Slot {
    key: CacheKey,
    value: Arc<Vec<u8>>,
    charge: u64,
    refs: u32,
    deleted: bool,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A single LRU shard: a slab of slots linked into a recency list, `head`
/// being most-recently-used and `tail` least-recently-used.
struct Shard {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    index: HashMap<CacheKey, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    capacity: u64,
    usage: u64,
    hits: u64,
    misses: u64,
}

impl Shard {
    fn new(capacity: u64) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            capacity,
            usage: 0,
            hits: 0,
            misses: 0,
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().unwrap();
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
        let slot = self.slots[idx].as_mut().unwrap();
        slot.prev = None;
        slot.next = None;
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let slot = self.slots[idx].as_mut().unwrap();
            slot.prev = None;
            slot.next = old_head;
        }
        if let Some(h) = old_head {
            self.slots[h].as_mut().unwrap().prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    fn promote(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn alloc_slot(&mut self, slot: Slot) -> usize {
        if let Some(idx) = self.free.pop() {
            self.slots[idx] = Some(slot);
            idx
        } else {
            self.slots.push(Some(slot));
            self.slots.len() - 1
        }
    }

    fn physically_remove(&mut self, idx: usize) {
        self.unlink(idx);
        let slot = self.slots[idx].take().unwrap();
        self.usage -= slot.charge;
        // Only drop the index entry if it still points at this slot: a
        // duplicate insert may have already redirected the key to a newer
        // slot while this one waited, pinned, for its last release.
        if self.index.get(&slot.key) == Some(&idx) {
            self.index.remove(&slot.key);
        }
        self.free.push(idx);
    }

    /// Evicts unpinned, non-deleted entries from the LRU end until usage
    /// plus `incoming` fits within capacity, or no more evictable entries
    /// remain.
    fn evict_to_fit(&mut self, incoming: u64) {
        let mut cursor = self.tail;
        while self.usage + incoming > self.capacity {
            let Some(idx) = cursor else { break };
            let slot = self.slots[idx].as_ref().unwrap();
            let prev = slot.prev;
            if slot.refs == 0 {
                trace!(file_number = slot.key.file_number, block_offset = slot.key.block_offset, "cache evict");
                self.physically_remove(idx);
            }
            cursor = prev;
        }
    }

    fn insert(&mut self, key: CacheKey, value: Vec<u8>, charge: u64) -> (Arc<Vec<u8>>, usize) {
        if let Some(&idx) = self.index.get(&key) {
            let slot = self.slots[idx].as_mut().unwrap();
            if slot.refs == 0 {
                self.physically_remove(idx);
            } else {
                // Still pinned by an outstanding handle: mark it deleted and
                // leave it in the slab, same as `erase`, instead of freeing
                // its slot index for immediate reuse out from under that
                // handle's eventual `release`.
                slot.deleted = true;
            }
        }
        self.evict_to_fit(charge);
        let value = Arc::new(value);
        let slot = Slot {
            key,
            value: value.clone(),
            charge,
            refs: 1,
            deleted: false,
            prev: None,
            next: None,
        };
        let idx = self.alloc_slot(slot);
        self.push_front(idx);
        self.index.insert(key, idx);
        self.usage += charge;
        (value, idx)
    }

    fn lookup(&mut self, key: &CacheKey) -> Option<(Arc<Vec<u8>>, usize)> {
        let Some(&idx) = self.index.get(key) else {
            self.misses += 1;
            return None;
        };
        let deleted = self.slots[idx].as_ref().unwrap().deleted;
        if deleted {
            self.misses += 1;
            return None;
        }
        self.hits += 1;
        self.promote(idx);
        let slot = self.slots[idx].as_mut().unwrap();
        slot.refs += 1;
        Some((slot.value.clone(), idx))
    }

    fn release(&mut self, idx: usize) {
        let Some(slot) = self.slots[idx].as_mut() else {
            return;
        };
        slot.refs = slot.refs.saturating_sub(1);
        if slot.refs == 0 && slot.deleted {
            self.physically_remove(idx);
        }
    }

    fn erase(&mut self, key: &CacheKey) {
        let Some(&idx) = self.index.get(key) else {
            return;
        };
        let slot = self.slots[idx].as_mut().unwrap();
        slot.deleted = true;
        if slot.refs == 0 {
            self.physically_remove(idx);
        }
    }

    fn set_capacity(&mut self, capacity: u64) {
        self.capacity = capacity;
        self.evict_to_fit(0);
    }

    fn close(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
        self.usage = 0;
    }
}

/// A pinned reference into the cache. Keeps the value alive and the entry
/// eviction-immune until dropped (or [`CacheHandle::release`]d early).
pub struct CacheHandle {
    shard: Arc<Mutex<Shard>>,
    slot: usize,
    key: CacheKey,
    value: Arc<Vec<u8>>,
}

impl CacheHandle {
    pub fn key(&self) -> CacheKey {
        self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Releases the pin now instead of waiting for `Drop`.
    pub fn release(self) {
        drop(self)
    }
}

impl Drop for CacheHandle {
    fn drop(&mut self) {
        if let Ok(mut shard) = self.shard.lock() {
            shard.release(self.slot);
        }
    }
}

/// Aggregate hit/miss counters across all shards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// A sharded LRU block cache.
pub struct Cache {
    shards: Vec<Arc<Mutex<Shard>>>,
}

impl Cache {
    /// `num_shards` is rounded up to the next power of two (minimum 1,
    /// default 16 via [`Cache::new`] when called with the reference
    /// default). `capacity` is split evenly across shards, each getting
    /// at least 1.
    pub fn with_shards(capacity: u64, num_shards: usize) -> Self {
        let num_shards = num_shards.max(1).next_power_of_two();
        let per_shard = (capacity / num_shards as u64).max(1);
        let shards = (0..num_shards)
            .map(|_| Arc::new(Mutex::new(Shard::new(per_shard))))
            .collect();
        debug!(num_shards, per_shard, "cache initialized");
        Self { shards }
    }

    pub fn new(capacity: u64) -> Self {
        Self::with_shards(capacity, 16)
    }

    fn shard_index(&self, key: &CacheKey) -> usize {
        let mixed = key.file_number ^ key.block_offset.wrapping_mul(SHARD_MULTIPLIER);
        (mixed as usize) & (self.shards.len() - 1)
    }

    fn shard_for(&self, key: &CacheKey) -> &Arc<Mutex<Shard>> {
        &self.shards[self.shard_index(key)]
    }

    pub fn insert(&self, key: CacheKey, value: Vec<u8>, charge: u64) -> CacheHandle {
        let shard = self.shard_for(&key).clone();
        let (value, slot) = shard.lock().unwrap().insert(key, value, charge);
        CacheHandle {
            shard,
            slot,
            key,
            value,
        }
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<CacheHandle> {
        let shard = self.shard_for(key).clone();
        let (value, slot) = shard.lock().unwrap().lookup(key)?;
        Some(CacheHandle {
            shard,
            slot,
            key: *key,
            value,
        })
    }

    pub fn erase(&self, key: &CacheKey) {
        self.shard_for(key).lock().unwrap().erase(key);
    }

    pub fn set_capacity(&self, capacity: u64) {
        let per_shard = (capacity / self.shards.len() as u64).max(1);
        for shard in &self.shards {
            shard.lock().unwrap().set_capacity(per_shard);
        }
    }

    pub fn close(&self) {
        for shard in &self.shards {
            shard.lock().unwrap().close();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for shard in &self.shards {
            let shard = shard.lock().unwrap();
            stats.hits += shard.hits;
            stats.misses += shard.misses;
        }
        stats
    }

    pub fn usage(&self) -> u64 {
        self.shards.iter().map(|s| s.lock().unwrap().usage).sum()
    }

    pub fn num_shards(&self) -> usize {
        self.shards.len()
    }
}
