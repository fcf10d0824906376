use crate::checksum::*;

#[test]
fn mask_unmask_roundtrip() {
    for &crc in &[0u32, 1, 0xDEAD_BEEF, u32::MAX, 0x1234_5678] {
        assert_eq!(unmask(mask(crc)), crc);
    }
}

#[test]
fn mask_changes_value() {
    // A masked CRC should not equal the raw CRC for typical inputs.
    assert_ne!(mask(0x1234_5678), 0x1234_5678);
}

#[test]
fn checksum_type_roundtrips_through_u8() {
    for kind in [
        ChecksumType::NoChecksum,
        ChecksumType::Crc32c,
        ChecksumType::Xxh3,
        ChecksumType::XxHash64,
    ] {
        assert_eq!(ChecksumType::from_u8(kind.as_u8()), Some(kind));
    }
}

#[test]
fn checksum_type_rejects_unknown_byte() {
    assert_eq!(ChecksumType::from_u8(200), None);
}

#[test]
fn no_checksum_always_zero() {
    assert_eq!(checksum(ChecksumType::NoChecksum, b"anything"), 0);
    assert_eq!(
        checksum_with_last_byte(ChecksumType::NoChecksum, b"anything", 7),
        0
    );
}
