//! On-disk layout of the user table image.
//!
//! All multi-byte fields are big-endian.
//!
//! ```text
//! header (8 bytes)
//!   0..4   magic "WDN1"
//!   4      layout version (1)
//!   5      PIN storage mode (0 plaintext, 1 hashed)
//!   6      record count
//!   7      XOR checksum over every record byte
//! record (24 bytes each, directly after the header)
//!   0..8   credential id (u64)
//!   8      permission level (0 none, 1 standard, 2 privileged)
//!   9      flags (bit 0 active, bit 1 has PIN)
//!   10     PIN length (plaintext mode; 0 in hashed mode)
//!   11     reserved, 0
//!   12..24 PIN field: ASCII digits zero-padded, or the PIN digest
//! ```
//!
//! An erased device reads back as `0xFF` everywhere, so a header whose magic
//! is all `0xFF` is reported as blank rather than corrupt.

use crate::{
    error::{StorageError, StorageResult},
    record::{PIN_HASH_LEN, PinSecret, UserRecord},
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use warden_core::{CredentialId, PermissionLevel, Pin, PinStorage, constants::MAX_USERS};

pub const MAGIC: [u8; 4] = *b"WDN1";
pub const LAYOUT_VERSION: u8 = 1;
pub const HEADER_LEN: usize = 8;
pub const RECORD_LEN: usize = 24;
pub const PIN_FIELD_LEN: usize = PIN_HASH_LEN;

const FLAG_ACTIVE: u8 = 0b01;
const FLAG_HAS_PIN: u8 = 0b10;
const ERASED_MAGIC: [u8; 4] = [0xFF; 4];

/// Decoded image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub mode: PinStorage,
    pub count: usize,
    pub checksum: u8,
}

impl Header {
    /// Bytes occupied by the records this header announces.
    pub fn body_len(&self) -> usize {
        self.count * RECORD_LEN
    }
}

/// Records that fit in a device of `memory_size` bytes.
pub fn capacity(memory_size: usize) -> usize {
    (memory_size.saturating_sub(HEADER_LEN) / RECORD_LEN).min(MAX_USERS)
}

/// Total image size for `count` records.
pub fn image_len(count: usize) -> usize {
    HEADER_LEN + count * RECORD_LEN
}

/// Encode a full image.
///
/// # Errors
///
/// Returns `StorageError::Validation` if there are more records than the count
/// byte can announce, or a hashed PIN would have to go into a plaintext image.
pub fn encode(records: &[UserRecord], mode: PinStorage) -> StorageResult<Bytes> {
    let count = u8::try_from(records.len())
        .map_err(|_| StorageError::Validation(format!("{} records", records.len())))?;

    let mut body = BytesMut::with_capacity(records.len() * RECORD_LEN);
    for record in records {
        encode_record(&mut body, record, mode)?;
    }

    let mut image = BytesMut::with_capacity(image_len(records.len()));
    image.put_slice(&MAGIC);
    image.put_u8(LAYOUT_VERSION);
    image.put_u8(mode_code(mode));
    image.put_u8(count);
    image.put_u8(checksum(&body));
    image.put_slice(&body);
    Ok(image.freeze())
}

fn encode_record(buf: &mut BytesMut, record: &UserRecord, mode: PinStorage) -> StorageResult<()> {
    let mut flags = 0;
    if record.active {
        flags |= FLAG_ACTIVE;
    }
    let mut pin_len = 0u8;
    let mut field = [0u8; PIN_FIELD_LEN];

    match (&record.pin, mode) {
        (None, _) => {}
        (Some(PinSecret::Plain(pin)), PinStorage::Plaintext) => {
            flags |= FLAG_HAS_PIN;
            // Pin holds at most MAX_PIN_LENGTH digits
            pin_len = pin.len() as u8;
            field[..pin.len()].copy_from_slice(pin.as_str().as_bytes());
        }
        (Some(PinSecret::Plain(pin)), PinStorage::Hashed) => {
            flags |= FLAG_HAS_PIN;
            if let PinSecret::Hashed(digest) = PinSecret::hashed(record.credential, pin) {
                field = digest;
            }
        }
        (Some(PinSecret::Hashed(digest)), PinStorage::Hashed) => {
            flags |= FLAG_HAS_PIN;
            field = *digest;
        }
        (Some(PinSecret::Hashed(_)), PinStorage::Plaintext) => {
            return Err(StorageError::Validation(format!(
                "credential {} has a hashed PIN; plaintext image cannot hold it",
                record.credential
            )));
        }
    }

    buf.put_u64(record.credential.as_u64());
    buf.put_u8(record.level.to_u8());
    buf.put_u8(flags);
    buf.put_u8(pin_len);
    buf.put_u8(0);
    buf.put_slice(&field);
    Ok(())
}

/// Decode the header.
///
/// Returns `Ok(None)` for an erased device.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` for a wrong magic, an unknown version or
/// mode, or a record count beyond `capacity`.
pub fn decode_header(raw: &[u8; HEADER_LEN], capacity: usize) -> StorageResult<Option<Header>> {
    let mut buf = &raw[..];
    let mut magic = [0u8; 4];
    buf.copy_to_slice(&mut magic);

    if magic == ERASED_MAGIC {
        return Ok(None);
    }
    if magic != MAGIC {
        return Err(StorageError::Corrupt(format!("bad magic {magic:02X?}")));
    }

    let version = buf.get_u8();
    if version != LAYOUT_VERSION {
        return Err(StorageError::Corrupt(format!(
            "unsupported layout version {version}"
        )));
    }
    let mode = match buf.get_u8() {
        0 => PinStorage::Plaintext,
        1 => PinStorage::Hashed,
        other => return Err(StorageError::Corrupt(format!("unknown PIN mode {other}"))),
    };
    let count = usize::from(buf.get_u8());
    if count > capacity {
        return Err(StorageError::Corrupt(format!(
            "{count} records exceed capacity {capacity}"
        )));
    }

    Ok(Some(Header {
        mode,
        count,
        checksum: buf.get_u8(),
    }))
}

/// Decode the records following `header`.
///
/// # Errors
///
/// Returns `StorageError::Corrupt` on a short body, a checksum mismatch or a
/// record that does not decode.
pub fn decode_records(header: &Header, body: &[u8]) -> StorageResult<Vec<UserRecord>> {
    if body.len() != header.body_len() {
        return Err(StorageError::Corrupt(format!(
            "expected {} record bytes, got {}",
            header.body_len(),
            body.len()
        )));
    }
    let actual = checksum(body);
    if actual != header.checksum {
        return Err(StorageError::Corrupt(format!(
            "checksum {actual:#04x} != {:#04x}",
            header.checksum
        )));
    }

    body.chunks_exact(RECORD_LEN)
        .map(|chunk| decode_record(chunk, header.mode))
        .collect()
}

fn decode_record(mut buf: &[u8], mode: PinStorage) -> StorageResult<UserRecord> {
    let credential = CredentialId::new(buf.get_u64());
    let level = PermissionLevel::from_u8(buf.get_u8())
        .map_err(|e| StorageError::Corrupt(format!("credential {credential}: {e}")))?;
    let flags = buf.get_u8();
    let pin_len = usize::from(buf.get_u8());
    buf.advance(1);
    let mut field = [0u8; PIN_FIELD_LEN];
    buf.copy_to_slice(&mut field);

    let pin = if flags & FLAG_HAS_PIN == 0 {
        None
    } else {
        Some(match mode {
            PinStorage::Hashed => PinSecret::Hashed(field),
            PinStorage::Plaintext => {
                let digits = field
                    .get(..pin_len)
                    .and_then(|d| std::str::from_utf8(d).ok())
                    .ok_or_else(|| {
                        StorageError::Corrupt(format!("credential {credential}: PIN length {pin_len}"))
                    })?;
                let pin = Pin::new(digits)
                    .map_err(|e| StorageError::Corrupt(format!("credential {credential}: {e}")))?;
                PinSecret::Plain(pin)
            }
        })
    };

    Ok(UserRecord {
        credential,
        pin,
        level,
        active: flags & FLAG_ACTIVE != 0,
    })
}

fn mode_code(mode: PinStorage) -> u8 {
    match mode {
        PinStorage::Plaintext => 0,
        PinStorage::Hashed => 1,
    }
}

fn checksum(body: &[u8]) -> u8 {
    body.iter().fold(0, |acc, b| acc ^ b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn records() -> Vec<UserRecord> {
        vec![
            UserRecord::new(CredentialId::new(0x12_3456), PermissionLevel::Standard),
            UserRecord::new(CredentialId::new(0xDEAD_BEEF), PermissionLevel::Privileged)
                .with_pin(Pin::new("13579").unwrap()),
            UserRecord::new(CredentialId::new(0x01), PermissionLevel::None).inactive(),
        ]
    }

    fn split(image: &[u8]) -> ([u8; HEADER_LEN], &[u8]) {
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&image[..HEADER_LEN]);
        (header, &image[HEADER_LEN..])
    }

    #[test]
    fn test_plaintext_record_bytes() {
        let image = encode(&records()[1..2], PinStorage::Plaintext).unwrap();
        assert_eq!(image.len(), image_len(1));
        assert_eq!(&image[..7], b"WDN1\x01\x00\x01");
        let record = &image[HEADER_LEN..];
        assert_eq!(&record[..8], &0xDEAD_BEEFu64.to_be_bytes());
        assert_eq!(record[8], 2);
        assert_eq!(record[9], FLAG_ACTIVE | FLAG_HAS_PIN);
        assert_eq!(record[10], 5);
        assert_eq!(&record[12..24], b"13579\0\0\0\0\0\0\0");
    }

    #[rstest]
    #[case(PinStorage::Plaintext)]
    #[case(PinStorage::Hashed)]
    fn test_image_decodes(#[case] mode: PinStorage) {
        let image = encode(&records(), mode).unwrap();
        let (raw_header, body) = split(&image);
        let header = decode_header(&raw_header, 10).unwrap().unwrap();
        assert_eq!(header.mode, mode);
        assert_eq!(header.count, 3);

        let decoded = decode_records(&header, body).unwrap();
        assert_eq!(decoded.len(), 3);
        assert!(!decoded[2].active);
        assert!(decoded[1].verify_pin(&Pin::new("13579").unwrap()));
        assert_eq!(decoded[1].pin.as_ref().map(PinSecret::is_hashed), Some(mode == PinStorage::Hashed));
    }

    #[test]
    fn test_erased_header_is_blank() {
        assert_eq!(decode_header(&[0xFF; HEADER_LEN], 10).unwrap(), None);
    }

    #[rstest]
    #[case(*b"XDN1\x01\x00\x00\x00")]
    #[case(*b"WDN1\x02\x00\x00\x00")]
    #[case(*b"WDN1\x01\x07\x00\x00")]
    #[case(*b"WDN1\x01\x00\x0B\x00")]
    fn test_bad_header(#[case] raw: [u8; HEADER_LEN]) {
        assert!(matches!(
            decode_header(&raw, 10),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_checksum_mismatch() {
        let image = encode(&records(), PinStorage::Plaintext).unwrap();
        let mut body = image[HEADER_LEN..].to_vec();
        body[3] ^= 0x10;
        let (raw_header, _) = split(&image);
        let header = decode_header(&raw_header, 10).unwrap().unwrap();
        assert!(matches!(
            decode_records(&header, &body),
            Err(StorageError::Corrupt(_))
        ));
    }

    #[test]
    fn test_hashed_pin_refused_in_plaintext_image() {
        let user = UserRecord::new(CredentialId::new(3), PermissionLevel::Standard)
            .with_secret(PinSecret::hashed(CredentialId::new(3), &Pin::new("1").unwrap()));
        assert!(matches!(
            encode(&[user], PinStorage::Plaintext),
            Err(StorageError::Validation(_))
        ));
    }

    #[rstest]
    #[case(0, 0)]
    #[case(HEADER_LEN + RECORD_LEN - 1, 0)]
    #[case(1024, 42)]
    #[case(65536, MAX_USERS)]
    fn test_capacity(#[case] size: usize, #[case] expected: usize) {
        assert_eq!(capacity(size), expected);
    }
}
