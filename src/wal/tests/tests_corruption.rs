use std::io::{Seek, SeekFrom, Write};

use crate::wal::tests::helpers::{init_tracing, new_writer, reader_over};
use crate::wal::{ReaderMode, Reporter, WalError, WalRecord};

#[derive(Default)]
struct CountingReporter {
    corruptions: usize,
    old_records: usize,
}

impl Reporter for CountingReporter {
    fn corruption(&mut self, _bytes_dropped: u64, _reason: &str) {
        self.corruptions += 1;
    }
    fn old_record(&mut self, _bytes: u64) {
        self.old_records += 1;
    }
}

#[test]
fn lenient_reader_tolerates_torn_tail() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_record(b"good-record").unwrap();
    writer.sync().unwrap();

    // Simulate a torn write: a second record's header is present but its
    // payload was never fully flushed to disk before a crash.
    {
        let mut file = tmp.reopen().unwrap();
        file.seek(SeekFrom::End(0)).unwrap();
        // A plausible-looking header claiming a 50-byte payload, but only
        // 3 bytes actually follow.
        file.write_all(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap(); // bogus crc
        file.write_all(&50u16.to_le_bytes()).unwrap();
        file.write_all(&[1u8]).unwrap(); // Full
        file.write_all(b"abc").unwrap();
    }

    let mut reader = reader_over(&tmp, ReaderMode::Lenient, None);
    assert_eq!(
        reader.next_record().unwrap(),
        Some(WalRecord::Data(b"good-record".to_vec()))
    );
    // The torn record must not be returned, and no error propagates.
    assert_eq!(reader.next_record().unwrap(), None);
    // Once dead, the reader keeps returning EOF rather than re-reporting.
    assert_eq!(reader.next_record().unwrap(), None);
}

#[test]
fn lenient_reader_reports_corruption_exactly_once() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_record(b"good").unwrap();
    writer.sync().unwrap();
    {
        let mut file = tmp.reopen().unwrap();
        file.seek(SeekFrom::End(0)).unwrap();
        file.write_all(&[0, 0, 0, 0]).unwrap();
        file.write_all(&10u16.to_le_bytes()).unwrap();
        file.write_all(&[1u8]).unwrap();
        file.write_all(b"short").unwrap();
    }

    let mut reader =
        reader_over(&tmp, ReaderMode::Lenient, None).with_reporter(Box::new(CountingReporter::default()));
    assert!(reader.next_record().unwrap().is_some());
    assert!(reader.next_record().unwrap().is_none());
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn strict_reader_fails_immediately_on_checksum_mismatch() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_record(b"payload").unwrap();
    writer.sync().unwrap();

    {
        let mut file = tmp.reopen().unwrap();
        // Flip a bit inside the stored CRC field.
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(&[0xFF]).unwrap();
    }

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    let result = reader.next_record();
    assert!(matches!(result, Err(WalError::Corrupted(_))));
}

#[test]
fn strict_reader_fails_on_truncated_payload() {
    init_tracing();
    let (tmp, mut writer) = new_writer(false, 0);
    writer.add_record(b"payload").unwrap();
    writer.sync().unwrap();

    {
        let file = tmp.reopen().unwrap();
        let full_len = file.metadata().unwrap().len();
        file.set_len(full_len - 3).unwrap();
    }

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    let result = reader.next_record();
    assert_eq!(result, Err(WalError::Short));
}

#[test]
fn unexpected_middle_outside_record_is_corruption() {
    init_tracing();
    let (tmp, _writer) = new_writer(false, 0);
    {
        let mut file = tmp.reopen().unwrap();
        let payload = b"mid";
        let crc = crate::wal::format::frame_crc(3, None, payload); // Middle = 3
        let masked = crate::checksum::mask(crc);
        file.write_all(&masked.to_le_bytes()).unwrap();
        file.write_all(&(payload.len() as u16).to_le_bytes()).unwrap();
        file.write_all(&[3u8]).unwrap();
        file.write_all(payload).unwrap();
    }

    let mut reader = reader_over(&tmp, ReaderMode::Strict, None);
    assert_eq!(reader.next_record(), Err(WalError::UnexpectedMiddle));
}
