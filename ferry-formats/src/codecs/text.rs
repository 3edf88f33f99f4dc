//! Plain text (`.txt`, `.tex`, `.md`)

use crate::error::FormatResult;
use crate::registry::{Loader, Payload, Saver};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextCodec;

impl Loader for TextCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        Ok(Value::Text(payload.into_text()?))
    }
}

impl Saver for TextCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        match value {
            Value::Text(text) => Ok(text.as_bytes().to_vec()),
            other => Err(other.mismatch("text")),
        }
    }
}
