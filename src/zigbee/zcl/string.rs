//! ZCL character strings: one length byte followed by the raw bytes.

use crate::error::{Result, ZigbeeError};

/// Maximum length of manufacturer and model names.
pub const MAX_NAME_LENGTH: usize = 32;

/// Length byte marking an invalid (unset) string.
const INVALID_LENGTH: u8 = 0xFF;

/// Encode `value` as a length-prefixed ZCL char string.
pub fn encode_char_string(value: &str, max_len: usize) -> Result<Vec<u8>> {
    let bytes = value.as_bytes();
    let limit = max_len.min(INVALID_LENGTH as usize - 1);
    if bytes.len() > limit {
        return Err(ZigbeeError::StringTooLong {
            len: bytes.len(),
            max: limit,
        });
    }

    let mut encoded = Vec::with_capacity(bytes.len() + 1);
    encoded.push(bytes.len() as u8);
    encoded.extend_from_slice(bytes);
    Ok(encoded)
}

/// Decode a length-prefixed ZCL char string, recovering the original length.
pub fn decode_char_string(raw: &[u8]) -> Result<String> {
    let Some((&len, body)) = raw.split_first() else {
        return Err(ZigbeeError::MalformedString("empty buffer".to_string()));
    };
    if len == INVALID_LENGTH {
        return Err(ZigbeeError::MalformedString("invalid length marker".to_string()));
    }
    let len = len as usize;
    if body.len() < len {
        return Err(ZigbeeError::MalformedString(format!(
            "length byte {} exceeds {} available bytes",
            len,
            body.len()
        )));
    }

    Ok(String::from_utf8_lossy(&body[..len]).into_owned())
}
