//! Row key encoding.
//!
//! Keys are the entity id as 8 big-endian bytes, so a tree scan returns rows
//! in ascending id order.

use std::time::{SystemTime, UNIX_EPOCH};

/// Size of an encoded key.
pub const KEY_SIZE: usize = 8;

/// Encode an entity id as a tree key.
pub fn encode_id(id: i64) -> [u8; KEY_SIZE] {
    (id as u64).to_be_bytes()
}

/// Decode a tree key back into an entity id.
pub fn decode_id(bytes: &[u8]) -> Option<i64> {
    let bytes: [u8; KEY_SIZE] = bytes.try_into().ok()?;
    Some(u64::from_be_bytes(bytes) as i64)
}

/// Get current timestamp in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
