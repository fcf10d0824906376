use crate::encoding::{append_length_prefixed, append_varint32, encode_fixed64};
use crate::write_batch::{tag, Result, WriteBatch, WriteBatchHandler};

#[derive(Default)]
struct Recorder {
    ops: Vec<String>,
}

impl WriteBatchHandler for Recorder {
    fn mark_begin_prepare(&mut self, xid: &[u8]) -> Result<()> {
        self.ops
            .push(format!("begin_prepare({})", String::from_utf8_lossy(xid)));
        Ok(())
    }
    fn mark_end_prepare(&mut self, xid: &[u8]) -> Result<()> {
        self.ops
            .push(format!("end_prepare({})", String::from_utf8_lossy(xid)));
        Ok(())
    }
    fn blob_index(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        self.ops.push(format!(
            "blob_index(cf={cf}, {}, {})",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value)
        ));
        Ok(())
    }
    fn deletion_with_timestamp(&mut self, key: &[u8]) -> Result<()> {
        self.ops
            .push(format!("deletion_with_timestamp({})", String::from_utf8_lossy(key)));
        Ok(())
    }
    fn wide_column_entity(&mut self, cf: u32, key: &[u8], value: &[u8]) -> Result<()> {
        self.ops.push(format!(
            "wide_column_entity(cf={cf}, {}, {})",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value)
        ));
        Ok(())
    }
    fn put_with_preferred_seqno(
        &mut self,
        cf: u32,
        key: &[u8],
        value: &[u8],
        preferred_seqno: u64,
    ) -> Result<()> {
        self.ops.push(format!(
            "put_with_preferred_seqno(cf={cf}, {}, {}, seqno={preferred_seqno})",
            String::from_utf8_lossy(key),
            String::from_utf8_lossy(value)
        ));
        Ok(())
    }
}

fn batch_from_record(buf: Vec<u8>) -> WriteBatch {
    let mut bytes = vec![0u8; 12];
    bytes.extend_from_slice(&buf);
    WriteBatch::from_bytes(&bytes).unwrap()
}

#[test]
fn begin_unprepare_xid_routes_to_begin_not_end() {
    let mut buf = vec![tag::BEGIN_UNPREPARE_XID];
    append_length_prefixed(&mut buf, b"xid1");
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    batch.iterate(&mut recorder).unwrap();
    assert_eq!(recorder.ops, vec!["begin_prepare(xid1)".to_string()]);
}

#[test]
fn blob_index_dispatches_instead_of_corrupting() {
    let mut buf = vec![tag::BLOB_INDEX];
    append_length_prefixed(&mut buf, b"key");
    append_length_prefixed(&mut buf, b"blobref");
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    batch.iterate(&mut recorder).unwrap();
    assert_eq!(recorder.ops, vec!["blob_index(cf=0, key, blobref)".to_string()]);
}

#[test]
fn cf_blob_index_dispatches_with_cf_id() {
    let mut buf = vec![tag::CF_BLOB_INDEX];
    append_varint32(&mut buf, 5);
    append_length_prefixed(&mut buf, b"key");
    append_length_prefixed(&mut buf, b"blobref");
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    batch.iterate(&mut recorder).unwrap();
    assert_eq!(recorder.ops, vec!["blob_index(cf=5, key, blobref)".to_string()]);
}

#[test]
fn deletion_with_timestamp_dispatches_instead_of_corrupting() {
    let mut buf = vec![tag::DELETION_WITH_TIMESTAMP];
    append_length_prefixed(&mut buf, b"key-with-ts");
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    batch.iterate(&mut recorder).unwrap();
    assert_eq!(
        recorder.ops,
        vec!["deletion_with_timestamp(key-with-ts)".to_string()]
    );
}

#[test]
fn wide_column_entity_dispatches_instead_of_corrupting() {
    let mut buf = vec![tag::WIDE_COLUMN_ENTITY];
    append_length_prefixed(&mut buf, b"key");
    append_length_prefixed(&mut buf, b"cols");
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    batch.iterate(&mut recorder).unwrap();
    assert_eq!(
        recorder.ops,
        vec!["wide_column_entity(cf=0, key, cols)".to_string()]
    );
}

#[test]
fn cf_wide_column_entity_dispatches_with_cf_id() {
    let mut buf = vec![tag::CF_WIDE_COLUMN_ENTITY];
    append_varint32(&mut buf, 2);
    append_length_prefixed(&mut buf, b"key");
    append_length_prefixed(&mut buf, b"cols");
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    batch.iterate(&mut recorder).unwrap();
    assert_eq!(
        recorder.ops,
        vec!["wide_column_entity(cf=2, key, cols)".to_string()]
    );
}

#[test]
fn value_preferred_seqno_dispatches_with_decoded_seqno() {
    let mut buf = vec![tag::VALUE_PREFERRED_SEQNO];
    append_length_prefixed(&mut buf, b"key");
    append_length_prefixed(&mut buf, b"val");
    let mut seqno = [0u8; 8];
    encode_fixed64(&mut seqno, 0x1234);
    buf.extend_from_slice(&seqno);
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    batch.iterate(&mut recorder).unwrap();
    assert_eq!(
        recorder.ops,
        vec!["put_with_preferred_seqno(cf=0, key, val, seqno=4660)".to_string()]
    );
}

#[test]
fn cf_value_preferred_seqno_dispatches_with_cf_id_and_seqno() {
    let mut buf = vec![tag::CF_VALUE_PREFERRED_SEQNO];
    append_varint32(&mut buf, 9);
    append_length_prefixed(&mut buf, b"key");
    append_length_prefixed(&mut buf, b"val");
    let mut seqno = [0u8; 8];
    encode_fixed64(&mut seqno, 7);
    buf.extend_from_slice(&seqno);
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    batch.iterate(&mut recorder).unwrap();
    assert_eq!(
        recorder.ops,
        vec!["put_with_preferred_seqno(cf=9, key, val, seqno=7)".to_string()]
    );
}

#[test]
fn value_preferred_seqno_with_truncated_trailer_is_corrupted() {
    let mut buf = vec![tag::VALUE_PREFERRED_SEQNO];
    append_length_prefixed(&mut buf, b"key");
    append_length_prefixed(&mut buf, b"val");
    buf.extend_from_slice(&[0u8; 4]); // only 4 of the required 8 trailer bytes
    let batch = batch_from_record(buf);

    let mut recorder = Recorder::default();
    assert!(batch.iterate(&mut recorder).is_err());
}
