//! Range deletion storage and fragmentation.

/// A single `DeleteRange(seq, [start, end))` recorded against a memtable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTombstone {
    pub seq: u64,
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

/// A non-overlapping interval produced by fragmenting a set of
/// (possibly overlapping) [`RangeTombstone`]s, carrying the highest
/// sequence number among the originals that covered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeTombstoneFragment {
    pub seq: u64,
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

/// Sweeps the endpoints of `tombstones` into a sorted set of cut points,
/// then assigns each resulting interval the maximum sequence number among
/// the tombstones that cover it. Gaps with no covering tombstone are
/// omitted from the result.
pub fn fragment(tombstones: &[RangeTombstone]) -> Vec<RangeTombstoneFragment> {
    if tombstones.is_empty() {
        return Vec::new();
    }

    let mut endpoints: Vec<&[u8]> = Vec::with_capacity(tombstones.len() * 2);
    for t in tombstones {
        endpoints.push(&t.start);
        endpoints.push(&t.end);
    }
    endpoints.sort();
    endpoints.dedup();

    let mut fragments = Vec::new();
    for window in endpoints.windows(2) {
        let (start, end) = (window[0], window[1]);
        let covering_max_seq = tombstones
            .iter()
            .filter(|t| t.start.as_slice() <= start && end <= t.end.as_slice())
            .map(|t| t.seq)
            .max();
        if let Some(seq) = covering_max_seq {
            fragments.push(RangeTombstoneFragment {
                seq,
                start: start.to_vec(),
                end: end.to_vec(),
            });
        }
    }
    fragments
}
