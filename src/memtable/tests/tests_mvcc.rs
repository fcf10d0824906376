use crate::memtable::{Memtable, ValueType};

#[test]
fn empty_memtable_misses_everything() {
    let table = Memtable::new();
    let (value, found, deleted) = table.get(b"key", 100);
    assert_eq!(value, None);
    assert!(!found);
    assert!(!deleted);
}

#[test]
fn put_then_get_at_same_sequence() {
    let table = Memtable::new();
    table.add(b"key", 5, ValueType::Value, b"value");
    let (value, found, _) = table.get(b"key", 5);
    assert_eq!(value.as_deref(), Some(b"value".as_slice()));
    assert!(found);
}

#[test]
fn get_is_invisible_to_writes_after_the_read_sequence() {
    let table = Memtable::new();
    table.add(b"key", 10, ValueType::Value, b"new");
    let (value, found, _) = table.get(b"key", 5);
    assert_eq!(value, None);
    assert!(!found);
}

#[test]
fn get_returns_newest_version_at_or_below_read_sequence() {
    let table = Memtable::new();
    table.add(b"key", 1, ValueType::Value, b"v1");
    table.add(b"key", 2, ValueType::Value, b"v2");
    table.add(b"key", 3, ValueType::Value, b"v3");

    assert_eq!(
        table.get(b"key", 2).0.as_deref(),
        Some(b"v2".as_slice())
    );
    assert_eq!(
        table.get(b"key", 3).0.as_deref(),
        Some(b"v3".as_slice())
    );
    assert_eq!(
        table.get(b"key", 1).0.as_deref(),
        Some(b"v1".as_slice())
    );
}

#[test]
fn deletion_hides_older_values_but_is_itself_visible() {
    let table = Memtable::new();
    table.add(b"key", 1, ValueType::Value, b"v1");
    table.add(b"key", 2, ValueType::Deletion, b"");

    let (value, found, deleted) = table.get(b"key", 2);
    assert_eq!(value, None);
    assert!(found, "a deletion is a resolving entry, not a miss");
    assert!(deleted);
}

#[test]
fn single_deletion_resolves_like_deletion() {
    let table = Memtable::new();
    table.add(b"key", 1, ValueType::Value, b"v1");
    table.add(b"key", 2, ValueType::SingleDeletion, b"");

    let (value, found, deleted) = table.get(b"key", 2);
    assert_eq!(value, None);
    assert!(found);
    assert!(deleted);
}

#[test]
fn merge_entry_resolves_as_found_not_deleted() {
    let table = Memtable::new();
    table.add(b"key", 1, ValueType::Merge, b"op1");

    let (operand, found, deleted) = table.get(b"key", 1);
    assert_eq!(operand.as_deref(), Some(b"op1".as_slice()));
    assert!(found);
    assert!(!deleted);
}

#[test]
fn different_keys_do_not_interfere() {
    let table = Memtable::new();
    table.add(b"a", 1, ValueType::Value, b"va");
    table.add(b"b", 1, ValueType::Value, b"vb");

    assert_eq!(table.get(b"a", 1).0.as_deref(), Some(b"va".as_slice()));
    assert_eq!(table.get(b"b", 1).0.as_deref(), Some(b"vb".as_slice()));
}

#[test]
fn seq_and_entry_counters_track_writes() {
    let table = Memtable::new();
    assert!(table.is_empty());
    table.add(b"a", 5, ValueType::Value, b"x");
    table.add(b"a", 9, ValueType::Value, b"y");
    assert_eq!(table.num_entries(), 2);
    assert_eq!(table.min_seq(), Some(5));
    assert_eq!(table.max_seq(), Some(9));
    assert!(table.memory_usage() > 0);
}
