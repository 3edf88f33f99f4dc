//! Opaque binary files such as `.png`

use crate::error::FormatResult;
use crate::registry::Saver;
use crate::value::Value;

/// Writes [`Value::Bytes`] unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBytes;

impl Saver for RawBytes {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        match value {
            Value::Bytes(bytes) => Ok(bytes.to_vec()),
            other => Err(other.mismatch("bytes")),
        }
    }
}
