use byteorder::{BigEndian, ReadBytesExt};
use crc::Crc;
use std::io::Read;

use crate::errcorrupt;
use crate::error::{Error, Result};

/// Every record starts with a fixed-size header holding the following
/// fields, big-endian, concatenated without padding:
///
/// | -------------------------------------------------------------------- |
/// | crc (u32) | expiry (i32) | key length (i32) | value length (i32)     |
/// | -------------------------------------------------------------------- |
///
/// The key and value bytes follow immediately after. A zero value length
/// marks the record as a tombstone. A non-zero expiry is the day-number
/// (unix seconds / 86400) after which the record is no longer valid.
pub const RECORD_HEADER_SIZE: usize = 16;

/// CRC-32/IEEE, computed over everything after the crc field itself.
const CRC32: Crc<u32> = Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// The decoded header and key of one record. The value bytes are not read;
/// callers seek past them using `value_len`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMeta {
    pub expiry: i32,
    pub key: Vec<u8>,
    pub value_len: u32,
}

/// Encodes one record, tombstones included (empty value).
pub fn encode_record(key: &[u8], value: &[u8], expiry: i32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(RECORD_HEADER_SIZE + key.len() + value.len());
    buf.extend_from_slice(&[0u8; 4]); // crc, filled in below
    buf.extend_from_slice(&expiry.to_be_bytes());
    buf.extend_from_slice(&(key.len() as i32).to_be_bytes());
    buf.extend_from_slice(&(value.len() as i32).to_be_bytes());
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);

    let crc = CRC32.checksum(&buf[4..]);
    buf[..4].copy_from_slice(&crc.to_be_bytes());
    buf
}

/// Reads the header and key of the next record. Returns None on a clean end
/// of stream (no bytes left at a record boundary); a partial header or a
/// short key is a corruption error. The crc field is carried for external
/// integrity tooling and is not verified here.
pub fn read_record_meta<R: Read>(reader: &mut R) -> Result<Option<RecordMeta>> {
    let mut header = [0u8; RECORD_HEADER_SIZE];
    let mut filled = 0;
    while filled < header.len() {
        match reader.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < RECORD_HEADER_SIZE {
        return errcorrupt!("invalid header size: expected {RECORD_HEADER_SIZE} got {filled} bytes");
    }

    let mut fields = &header[..];
    let _crc = fields.read_u32::<BigEndian>()?;
    let expiry = fields.read_i32::<BigEndian>()?;
    let key_len = fields.read_i32::<BigEndian>()?;
    let value_len = fields.read_i32::<BigEndian>()?;
    if key_len < 0 || value_len < 0 {
        return errcorrupt!("negative record lengths: key {key_len}, value {value_len}");
    }

    let mut key = vec![0u8; key_len as usize];
    reader.read_exact(&mut key).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            Error::Corrupted(format!("invalid key size: expected {key_len} bytes"))
        }
        _ => Error::from(e),
    })?;

    Ok(Some(RecordMeta {
        expiry,
        key,
        value_len: value_len as u32,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_layout() {
        let encoded = encode_record(b"key1", b"value1", 7);

        assert_eq!(encoded.len(), RECORD_HEADER_SIZE + 4 + 6);
        assert_eq!(&encoded[4..8], &7i32.to_be_bytes());
        assert_eq!(&encoded[8..12], &4i32.to_be_bytes());
        assert_eq!(&encoded[12..16], &6i32.to_be_bytes());
        assert_eq!(&encoded[16..20], b"key1");
        assert_eq!(&encoded[20..], b"value1");

        // The crc covers everything after itself.
        let crc = u32::from_be_bytes(encoded[..4].try_into().unwrap());
        assert_eq!(crc, CRC32.checksum(&encoded[4..]));
    }

    #[test]
    fn test_encode_tombstone() {
        let encoded = encode_record(b"gone", b"", 0);
        assert_eq!(encoded.len(), RECORD_HEADER_SIZE + 4);
        assert_eq!(&encoded[12..16], &0i32.to_be_bytes());
    }

    #[test]
    fn test_decode_roundtrip() {
        let encoded = encode_record(b"key1", b"value1", 42);

        let mut reader = Cursor::new(&encoded);
        let meta = read_record_meta(&mut reader)
            .expect("decode failed")
            .expect("expected a record");

        // The value bytes are left unread for the caller to skip.
        assert_eq!(reader.position() as usize, RECORD_HEADER_SIZE + 4);

        assert_eq!(
            meta,
            RecordMeta {
                expiry: 42,
                key: b"key1".to_vec(),
                value_len: 6,
            }
        );
    }

    #[test]
    fn test_decode_clean_eof() {
        let mut reader = Cursor::new(Vec::new());
        assert_eq!(read_record_meta(&mut reader).unwrap(), None);
    }

    #[test]
    fn test_decode_partial_header() {
        let encoded = encode_record(b"key1", b"value1", 0);
        let mut reader = Cursor::new(&encoded[..9]);

        match read_record_meta(&mut reader) {
            Err(Error::Corrupted(_)) => {}
            other => panic!("expected Corrupted, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_short_key() {
        let encoded = encode_record(b"longish-key", b"v", 0);
        let mut reader = Cursor::new(&encoded[..RECORD_HEADER_SIZE + 3]);

        match read_record_meta(&mut reader) {
            Err(Error::Corrupted(_)) => {}
            other => panic!("expected Corrupted, got {other:?}"),
        }
    }
}
