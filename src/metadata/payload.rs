use crate::error::{Error, Result};
use crate::record::ColumnStatRecord;

const PAYLOAD_MAGIC: [u8; 2] = *b"CS";
const PAYLOAD_VERSION: u8 = 1;
/// magic + version + crc32
const PAYLOAD_HEADER_LEN: usize = 2 + 1 + 4;

/// Encodes a record as a column stats payload:
/// `[magic "CS"][version u8][crc32 of body, LE][bincode body]`.
pub fn encode_payload(record: &ColumnStatRecord) -> Result<Vec<u8>> {
    let body = bincode::encode_to_vec(record, bincode::config::standard())
        .map_err(|e| Error::Serialization(format!("Failed to encode column stats: {}", e)))?;

    let mut payload = Vec::with_capacity(PAYLOAD_HEADER_LEN + body.len());
    payload.extend_from_slice(&PAYLOAD_MAGIC);
    payload.push(PAYLOAD_VERSION);
    payload.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_payload(payload: &[u8]) -> Result<ColumnStatRecord> {
    if payload.len() < PAYLOAD_HEADER_LEN {
        return Err(Error::DecodeFailure(format!(
            "payload too short: {} bytes",
            payload.len()
        )));
    }

    if payload[..2] != PAYLOAD_MAGIC {
        return Err(Error::DecodeFailure("bad payload magic".into()));
    }

    if payload[2] != PAYLOAD_VERSION {
        return Err(Error::DecodeFailure(format!(
            "unsupported payload version {}",
            payload[2]
        )));
    }

    let expected = u32::from_le_bytes([payload[3], payload[4], payload[5], payload[6]]);
    let body = &payload[PAYLOAD_HEADER_LEN..];
    let actual = crc32fast::hash(body);
    if expected != actual {
        return Err(Error::DecodeFailure(format!(
            "checksum mismatch: expected {:08x}, found {:08x}",
            expected, actual
        )));
    }

    let (record, read): (ColumnStatRecord, usize) =
        bincode::decode_from_slice(body, bincode::config::standard())
            .map_err(|e| Error::DecodeFailure(e.to_string()))?;

    if read != body.len() {
        return Err(Error::DecodeFailure(format!(
            "{} trailing bytes after column stats",
            body.len() - read
        )));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::StatValue;

    fn sample() -> ColumnStatRecord {
        ColumnStatRecord::new(
            "part-0000.parquet",
            "amount",
            StatValue::Decimal {
                unscaled: -1050,
                precision: 12,
                scale: 2,
            },
            StatValue::Decimal {
                unscaled: 99_999,
                precision: 12,
                scale: 2,
            },
            3,
            1000,
        )
        .with_sizes(4096, 16384)
    }

    #[test]
    fn test_payload_preserves_record() {
        let record = sample();
        let decoded = decode_payload(&encode_payload(&record).unwrap()).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_corrupted_body_fails_checksum() {
        let mut payload = encode_payload(&sample()).unwrap();
        let last = payload.len() - 1;
        payload[last] ^= 0xff;
        let err = decode_payload(&payload).unwrap_err();
        assert!(matches!(err, Error::DecodeFailure(ref msg) if msg.contains("checksum")));
    }

    #[test]
    fn test_rejects_truncated_and_foreign_payloads() {
        assert!(matches!(decode_payload(b"CS"), Err(Error::DecodeFailure(_))));
        assert!(matches!(
            decode_payload(b"XX\x01\0\0\0\0body"),
            Err(Error::DecodeFailure(_))
        ));

        let mut payload = encode_payload(&sample()).unwrap();
        payload[2] = 9;
        let err = decode_payload(&payload).unwrap_err();
        assert!(err.to_string().contains("version 9"));
    }
}
