use crate::wal::tests::helpers::{init_tracing, new_writer, reader_over};
use crate::wal::{ReaderMode, WalRecord};

#[test]
fn empty_payload_yields_one_full_record_of_length_zero() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_record(b"").unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    assert_eq!(reader.next_record().unwrap(), Some(WalRecord::Data(vec![])));
    assert_eq!(reader.next_record().unwrap(), None);
}

#[test]
fn single_small_record_roundtrips_as_full() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_record(b"hello world").unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    assert_eq!(
        reader.next_record().unwrap(),
        Some(WalRecord::Data(b"hello world".to_vec()))
    );
    assert_eq!(reader.next_record().unwrap(), None);
}

#[test]
fn multiple_records_preserve_order() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_record(b"one").unwrap();
    writer.add_record(b"two").unwrap();
    writer.add_record(b"three").unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    let records: Vec<_> = std::iter::from_fn(|| reader.next_record().transpose())
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(
        records,
        vec![
            WalRecord::Data(b"one".to_vec()),
            WalRecord::Data(b"two".to_vec()),
            WalRecord::Data(b"three".to_vec()),
        ]
    );
}

#[test]
fn large_record_spans_multiple_blocks() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    writer.add_record(&payload).unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    let record = reader.next_record().unwrap().unwrap();
    assert_eq!(record, WalRecord::Data(payload));
    assert_eq!(reader.next_record().unwrap(), None);
}

#[test]
fn record_exactly_filling_a_block_is_full_type() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    // 32768 - 7 (legacy header) bytes fits exactly in one block as Full.
    let payload = vec![0xAB; 32768 - 7];
    writer.add_record(&payload).unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    assert_eq!(reader.next_record().unwrap(), Some(WalRecord::Data(payload)));
}

#[test]
fn mixed_small_and_large_records() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    let big: Vec<u8> = (0..70_000u32).map(|i| (i % 250) as u8).collect();
    writer.add_record(b"small-before").unwrap();
    writer.add_record(&big).unwrap();
    writer.add_record(b"small-after").unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    assert_eq!(
        reader.next_record().unwrap(),
        Some(WalRecord::Data(b"small-before".to_vec()))
    );
    assert_eq!(reader.next_record().unwrap(), Some(WalRecord::Data(big)));
    assert_eq!(
        reader.next_record().unwrap(),
        Some(WalRecord::Data(b"small-after".to_vec()))
    );
    assert_eq!(reader.next_record().unwrap(), None);
}
