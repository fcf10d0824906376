use crate::memtable::{fragment, Memtable, RangeTombstone, ValueType};

#[test]
fn range_tombstone_hides_covered_key() {
    let table = Memtable::new();
    table.add(b"key", 1, ValueType::Value, b"v1");
    table.add_range_tombstone(2, b"a", b"z");

    let (value, found, deleted) = table.get(b"key", 2);
    assert_eq!(value, None);
    assert!(found, "covered by a range tombstone that resolves the lookup");
    assert!(deleted);
}

#[test]
fn range_tombstone_does_not_hide_writes_after_it() {
    let table = Memtable::new();
    table.add_range_tombstone(1, b"a", b"z");
    table.add(b"key", 2, ValueType::Value, b"fresh");

    let (value, found, _) = table.get(b"key", 2);
    assert_eq!(value.as_deref(), Some(b"fresh".as_slice()));
    assert!(found);
}

#[test]
fn range_tombstone_end_is_exclusive() {
    let table = Memtable::new();
    table.add(b"z", 1, ValueType::Value, b"v");
    table.add_range_tombstone(2, b"a", b"z");

    let (value, found, _) = table.get(b"z", 2);
    assert_eq!(value.as_deref(), Some(b"v".as_slice()));
    assert!(found);
}

#[test]
fn key_outside_range_is_unaffected() {
    let table = Memtable::new();
    table.add(b"outside", 1, ValueType::Value, b"v");
    table.add_range_tombstone(2, b"m", b"z");

    let (value, found, _) = table.get(b"outside", 2);
    assert_eq!(value.as_deref(), Some(b"v".as_slice()));
    assert!(found);
}

#[test]
fn fragment_splits_overlapping_tombstones_and_keeps_max_seq() {
    let tombstones = vec![
        RangeTombstone { seq: 1, start: b"a".to_vec(), end: b"m".to_vec() },
        RangeTombstone { seq: 5, start: b"d".to_vec(), end: b"z".to_vec() },
    ];
    let fragments = fragment(&tombstones);

    // Expect three pieces: [a,d) seq 1, [d,m) seq 5 (max of overlap), [m,z) seq 5.
    assert_eq!(fragments.len(), 3);
    assert_eq!(fragments[0].start, b"a");
    assert_eq!(fragments[0].end, b"d");
    assert_eq!(fragments[0].seq, 1);
    assert_eq!(fragments[1].start, b"d");
    assert_eq!(fragments[1].end, b"m");
    assert_eq!(fragments[1].seq, 5);
    assert_eq!(fragments[2].start, b"m");
    assert_eq!(fragments[2].end, b"z");
    assert_eq!(fragments[2].seq, 5);
}

#[test]
fn fragment_of_empty_input_is_empty() {
    assert!(fragment(&[]).is_empty());
}

#[test]
fn fragmented_tombstones_accessor_delegates_to_fragment() {
    let table = Memtable::new();
    table.add_range_tombstone(1, b"a", b"m");
    table.add_range_tombstone(2, b"g", b"z");
    let fragments = table.fragmented_tombstones();
    assert!(!fragments.is_empty());
}
