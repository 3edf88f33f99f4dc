//! In-memory data model
//!
//! A load produces a [`Value`] and a save consumes one. Each variant is the
//! natural Rust shape of one family of file formats.

use bytes::Bytes;
use ndarray::ArrayD;
use std::path::PathBuf;

use crate::codecs::netcdf::Dataset;
use crate::error::{FormatError, FormatResult};

/// Header row plus data rows, all cells as text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .map(|row| row.get(idx).map(String::as_str).unwrap_or(""))
                .collect(),
        )
    }
}

/// Named worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// Pixel grid, band-interleaved, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub width: u32,
    pub height: u32,
    /// Samples per pixel
    pub bands: u16,
    pub data: Vec<f64>,
}

impl Raster {
    pub fn single_band(width: u32, height: u32, data: Vec<f64>) -> Self {
        Self { width, height, bands: 1, data }
    }

    pub fn pixel(&self, x: u32, y: u32, band: u16) -> Option<f64> {
        if x >= self.width || y >= self.height || band >= self.bands {
            return None;
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * self.bands as usize
            + band as usize;
        self.data.get(idx).copied()
    }
}

/// Result of a load, input of a save
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Json(serde_json::Value),
    Array(ArrayD<f64>),
    Table(Table),
    Workbook(Vec<Sheet>),
    Features(geojson::FeatureCollection),
    Geometries(Vec<geo_types::Geometry<f64>>),
    Raster(Raster),
    Dataset(Dataset),
    Bytes(Bytes),
    /// Local folder to archive
    Folder(PathBuf),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
            Value::Workbook(_) => "workbook",
            Value::Features(_) => "features",
            Value::Geometries(_) => "geometries",
            Value::Raster(_) => "raster",
            Value::Dataset(_) => "dataset",
            Value::Bytes(_) => "bytes",
            Value::Folder(_) => "folder",
        }
    }

    pub(crate) fn mismatch(&self, expected: &'static str) -> FormatError {
        FormatError::UnexpectedValue {
            expected,
            found: self.kind(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayD<f64>> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(json) => Some(json),
            _ => None,
        }
    }

    pub fn into_text(self) -> FormatResult<String> {
        match self {
            Value::Text(text) => Ok(text),
            other => Err(other.mismatch("text")),
        }
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::Json(json)
    }
}

impl From<ArrayD<f64>> for Value {
    fn from(array: ArrayD<f64>) -> Self {
        Value::Array(array)
    }
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Value::Table(table)
    }
}

impl From<Raster> for Value {
    fn from(raster: Raster) -> Self {
        Value::Raster(raster)
    }
}

impl From<Dataset> for Value {
    fn from(dataset: Dataset) -> Self {
        Value::Dataset(dataset)
    }
}
