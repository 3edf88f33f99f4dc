//! GeoTIFF-style rasters

use std::io::Cursor;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, TiffEncoder};

use crate::error::{FormatError, FormatResult};
use crate::registry::{Loader, Payload, Saver};
use crate::value::{Raster, Value};

/// Any integer or float sample type on load, single-band f64 on save
#[derive(Debug, Clone, Copy, Default)]
pub struct TiffCodec;

fn widen<T: Copy + Into<f64>>(samples: Vec<T>) -> Vec<f64> {
    samples.into_iter().map(Into::into).collect()
}

fn samples(image: DecodingResult) -> Vec<f64> {
    match image {
        DecodingResult::U8(v) => widen(v),
        DecodingResult::U16(v) => widen(v),
        DecodingResult::U32(v) => widen(v),
        DecodingResult::U64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::I8(v) => widen(v),
        DecodingResult::I16(v) => widen(v),
        DecodingResult::I32(v) => widen(v),
        DecodingResult::I64(v) => v.into_iter().map(|s| s as f64).collect(),
        DecodingResult::F32(v) => widen(v),
        DecodingResult::F64(v) => v,
    }
}

impl Loader for TiffCodec {
    fn load(&self, payload: Payload) -> FormatResult<Value> {
        let mut decoder = Decoder::new(Cursor::new(payload.into_bytes()))?;
        let (width, height) = decoder.dimensions()?;
        let data = samples(decoder.read_image()?);

        let pixels = width as usize * height as usize;
        if pixels == 0 || data.len() % pixels != 0 {
            return Err(FormatError::malformed(format!(
                "{} samples do not fill a {width}x{height} image",
                data.len()
            )));
        }
        let bands = u16::try_from(data.len() / pixels)
            .map_err(|_| FormatError::malformed("too many samples per pixel"))?;

        Ok(Value::Raster(Raster { width, height, bands, data }))
    }
}

impl Saver for TiffCodec {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        let raster = match value {
            Value::Raster(raster) => raster,
            other => return Err(other.mismatch("raster")),
        };
        if raster.bands != 1 {
            return Err(FormatError::malformed(format!(
                "only single-band rasters can be written, got {} bands",
                raster.bands
            )));
        }
        if raster.data.len() != raster.width as usize * raster.height as usize {
            return Err(FormatError::malformed("raster data does not match its dimensions"));
        }

        let mut out = Cursor::new(Vec::new());
        TiffEncoder::new(&mut out)?.write_image::<colortype::Gray64Float>(
            raster.width,
            raster.height,
            &raster.data,
        )?;
        Ok(out.into_inner())
    }
}
