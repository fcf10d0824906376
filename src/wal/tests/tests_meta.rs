use crate::wal::tests::helpers::{init_tracing, new_writer, reader_over};
use crate::wal::{ReaderMode, WalRecord};

#[test]
fn set_compression_roundtrips() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_set_compression(2).unwrap();
    writer.add_record(b"after").unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    assert_eq!(reader.next_record().unwrap(), Some(WalRecord::SetCompression(2)));
    assert_eq!(
        reader.next_record().unwrap(),
        Some(WalRecord::Data(b"after".to_vec()))
    );
}

#[test]
fn user_defined_timestamp_size_roundtrips() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_user_defined_timestamp_size(8).unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    assert_eq!(
        reader.next_record().unwrap(),
        Some(WalRecord::UserDefinedTimestampSize(8))
    );
}

#[test]
fn predecessor_wal_info_roundtrips() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_predecessor_wal_info(41, 1 << 20, 999).unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    assert_eq!(
        reader.next_record().unwrap(),
        Some(WalRecord::PredecessorWalInfo {
            log_number: 41,
            size_bytes: 1 << 20,
            last_sequence: 999,
        })
    );
}

#[test]
fn recyclable_meta_records_roundtrip() {
    init_tracing();
    let (tmp, mut writer) = new_writer(true, 5);
    writer.add_set_compression(1).unwrap();
    writer.sync().unwrap();

    let mut reader = reader_over(&tmp, ReaderMode::Strict, Some(5));
    assert_eq!(reader.next_record().unwrap(), Some(WalRecord::SetCompression(1)));
}
