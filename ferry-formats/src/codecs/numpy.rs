//! NumPy `.npy` arrays and compressed `.npz` archives

use ndarray::ArrayD;
use ndarray_npy::{NpzReader, NpzWriter, ReadNpyExt, WriteNpyExt};
use std::io::Cursor;

use crate::error::{FormatError, FormatResult};
use crate::registry::{Loader, Payload, Saver};
use crate::value::Value;

/// Member name a compressed archive stores its single array under.
pub const NPZ_MEMBER: &str = "indicator";

fn read_npy(raw: &[u8]) -> FormatResult<ArrayD<f64>> {
    let first = match ArrayD::<f64>::read_npy(raw) {
        Ok(array) => return Ok(array),
        Err(e) => e,
    };
    // Narrower element types are widened to f64.
    if let Ok(array) = ArrayD::<f32>::read_npy(raw) {
        return Ok(array.mapv(f64::from));
    }
    if let Ok(array) = ArrayD::<i64>::read_npy(raw) {
        return Ok(array.mapv(|v| v as f64));
    }
    if let Ok(array) = ArrayD::<i32>::read_npy(raw) {
        return Ok(array.mapv(f64::from));
    }
    Err(first.into())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NpyCodec;

impl Loader for NpyCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        Ok(Value::Array(read_npy(&payload.into_bytes())?))
    }
}

impl Saver for NpyCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        let array = value.as_array().ok_or_else(|| value.mismatch("array"))?;
        let mut out = Vec::new();
        array.write_npy(&mut out)?;
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NpzCodec;

impl Loader for NpzCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        let mut npz = NpzReader::new(Cursor::new(payload.into_bytes()))?;
        let member = npz
            .names()?
            .into_iter()
            .find(|name| name.trim_end_matches(".npy") == NPZ_MEMBER)
            .ok_or_else(|| FormatError::malformed(format!("no `{NPZ_MEMBER}` array in archive")))?;

        let first = match npz.by_name::<_, ndarray::IxDyn>(&member) {
            Ok(array) => return Ok(Value::Array(array)),
            Err(e) => e,
        };
        if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<f32>, ndarray::IxDyn>(&member) {
            return Ok(Value::Array(array.mapv(f64::from)));
        }
        if let Ok(array) = npz.by_name::<ndarray::OwnedRepr<i64>, ndarray::IxDyn>(&member) {
            return Ok(Value::Array(array.mapv(|v| v as f64)));
        }
        Err(first.into())
    }
}

impl Saver for NpzCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        let array = value.as_array().ok_or_else(|| value.mismatch("array"))?;
        let mut npz = NpzWriter::new_compressed(Cursor::new(Vec::new()));
        npz.add_array(NPZ_MEMBER, array)?;
        Ok(npz.finish()?.into_inner())
    }
}
