use std::fs::File;
use std::io::{Seek, SeekFrom};

use tempfile::NamedTempFile;
use tracing_subscriber::EnvFilter;

use crate::wal::{ReaderMode, WalReader, WalWriter};

/// Initialize tracing controlled by `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A fresh, empty backing file plus a writer over it.
pub fn new_writer(recyclable: bool, log_number: u32) -> (NamedTempFile, WalWriter) {
    let tmp = NamedTempFile::new().unwrap();
    let file = tmp.reopen().unwrap();
    let writer = WalWriter::new(file, log_number, recyclable).unwrap();
    (tmp, writer)
}

/// Opens a fresh read handle over `tmp` positioned at the start, wrapped in
/// a reader of the given mode.
pub fn reader_over(
    tmp: &NamedTempFile,
    mode: ReaderMode,
    expected_log_number: Option<u32>,
) -> WalReader<File> {
    let mut file = tmp.reopen().unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    WalReader::new(file, mode, expected_log_number)
}
