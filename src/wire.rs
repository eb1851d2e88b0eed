//! Confluent wire format
//!
//! ```text
//! +-------+----------------------+-------------------------+
//! | 0x00  | schema id (i32, BE)  | Avro binary datum ...   |
//! +-------+----------------------+-------------------------+
//!   1 B          4 B                 rest of the buffer
//! ```
//!
//! There is no length field; the payload runs to the end of the buffer.

use std::io::Cursor;

use apache_avro::types::Value;
use apache_avro::Schema;

use crate::error::{RegistryError, Result};

/// Format tag in byte 0 of every envelope
pub const MAGIC_BYTE: u8 = 0;

/// Bytes preceding the Avro payload
pub const HEADER_LEN: usize = 5;

/// Borrowed view of a framed message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireEnvelope<'a> {
    pub schema_id: i32,
    pub payload: &'a [u8],
}

impl<'a> WireEnvelope<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        let (schema_id, payload) = unframe(bytes)?;
        Ok(Self { schema_id, payload })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        frame(self.schema_id, self.payload)
    }
}

/// Prefix `payload` with the envelope header.
pub fn frame(schema_id: i32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.push(MAGIC_BYTE);
    out.extend_from_slice(&schema_id.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Split an envelope into schema id and payload.
pub fn unframe(bytes: &[u8]) -> Result<(i32, &[u8])> {
    if bytes.len() < HEADER_LEN {
        return Err(RegistryError::InvalidWireFormat(format!(
            "{} bytes is shorter than the {}-byte header",
            bytes.len(),
            HEADER_LEN
        )));
    }
    if bytes[0] != MAGIC_BYTE {
        return Err(RegistryError::InvalidWireFormat(format!(
            "unknown magic byte {:#04x}",
            bytes[0]
        )));
    }
    let schema_id = i32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    Ok((schema_id, &bytes[HEADER_LEN..]))
}

/// Encode `value` as an Avro datum, framed only when `schema_id` is given.
///
/// Without an id the output is plain Avro binary. Which of the two a caller
/// receives is decided by whether registry integration is active, never by
/// inspecting the bytes.
pub fn encode(value: &Value, schema: &Schema, schema_id: Option<i32>) -> Result<Vec<u8>> {
    let payload = apache_avro::to_avro_datum(schema, value.clone())?;
    Ok(match schema_id {
        Some(id) => frame(id, &payload),
        None => payload,
    })
}

/// Decode a headerless Avro datum written with `schema`.
pub fn decode(bytes: &[u8], schema: &Schema) -> Result<Value> {
    let mut cursor = Cursor::new(bytes);
    Ok(apache_avro::from_avro_datum(schema, &mut cursor, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let framed = frame(7, &[0xAA, 0xBB]);
        assert_eq!(framed, vec![0x00, 0x00, 0x00, 0x00, 0x07, 0xAA, 0xBB]);
    }

    #[test]
    fn test_frame_unframe_inverse() {
        for (id, payload) in [
            (0, vec![]),
            (1, vec![1u8]),
            (-1, vec![0u8; 64]),
            (i32::MAX, b"avro".to_vec()),
            (i32::MIN, vec![0xFF; 3]),
        ] {
            let framed = frame(id, &payload);
            assert_eq!(framed.len(), payload.len() + HEADER_LEN);
            let (got_id, got_payload) = unframe(&framed).unwrap();
            assert_eq!(got_id, id);
            assert_eq!(got_payload, payload.as_slice());
        }
    }

    #[test]
    fn test_unframe_rejects_short_and_bad_magic() {
        assert!(matches!(
            unframe(&[0, 0, 0]),
            Err(RegistryError::InvalidWireFormat(_))
        ));
        assert!(matches!(
            unframe(&[1, 0, 0, 0, 1, 2]),
            Err(RegistryError::InvalidWireFormat(_))
        ));
    }

    #[test]
    fn test_encode_with_and_without_id() {
        let schema = Schema::parse_str(r#""long""#).unwrap();
        let raw = encode(&Value::Long(3), &schema, None).unwrap();
        assert_eq!(raw, vec![0x06]);

        let framed = encode(&Value::Long(3), &schema, Some(9)).unwrap();
        let envelope = WireEnvelope::parse(&framed).unwrap();
        assert_eq!(envelope.schema_id, 9);
        assert_eq!(envelope.payload, raw.as_slice());
        assert_eq!(decode(envelope.payload, &schema).unwrap(), Value::Long(3));
    }
}
