//! Extension-keyed codec registry
//!
//! Two independent tables map a file extension to the object able to
//! load or save it. Dispatch is a single lookup; a missing entry is an
//! [`FerryError::UnsupportedFormat`] raised before any I/O happens.

use bytes::Bytes;
use ferry_core::{FerryError, FerryResult, LogicalPath};
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, error};

use crate::codecs::{
    archive::FolderArchive, json::GeoJsonCodec, json::JsonCodec, netcdf::NetCdfCodec,
    numpy::NpyCodec, numpy::NpzCodec, raw::RawBytes, shapefile::ShapefileCodec,
    tabular::CsvCodec, tabular::XlsxCodec, text::TextCodec, tiff::TiffCodec,
};
use crate::error::{FormatError, FormatResult};
use crate::value::Value;

/// Multi-file vector format stored as a zip archive.
pub const SHP_EXT: &str = ".shp";
pub const ZIP_EXT: &str = ".zip";

/// Extensions fetched as raw bytes; everything else is fetched as UTF-8 text.
pub const BINARY_EXTENSIONS: &[&str] = &[
    ".npy", ".npz", ".nc", ".tif", ".csv", ".xlsx", ".shp", ".zip", ".png",
];

/// How a file travels between the store and its loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Binary,
    Text,
}

impl TransferMode {
    pub fn for_extension(extension: &str) -> Self {
        if BINARY_EXTENSIONS.contains(&extension) {
            TransferMode::Binary
        } else {
            TransferMode::Text
        }
    }
}

/// Fetched file content handed to a loader
#[derive(Debug, Clone)]
pub enum Payload {
    Binary(Bytes),
    Text(String),
}

impl Payload {
    pub fn decode(mode: TransferMode, raw: Bytes) -> FormatResult<Self> {
        match mode {
            TransferMode::Binary => Ok(Payload::Binary(raw)),
            TransferMode::Text => Ok(Payload::Text(String::from_utf8(raw.to_vec())?)),
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            Payload::Binary(bytes) => bytes,
            Payload::Text(text) => Bytes::from(text),
        }
    }

    pub fn into_text(self) -> FormatResult<String> {
        match self {
            Payload::Binary(bytes) => Ok(String::from_utf8(bytes.to_vec())?),
            Payload::Text(text) => Ok(text),
        }
    }
}

/// Turns fetched content into a [`Value`]
pub trait Loader: Send + Sync {
    fn load(&self, payload: Payload) -> FormatResult<Value>;
}

/// Serialises a [`Value`] into the bytes of one file
pub trait Saver: Send + Sync {
    /// `name` is the file name the value is saved under.
    fn save(&self, value: &Value, name: &str) -> FormatResult<Vec<u8>>;
}

/// Load and save tables, read-only after construction
#[derive(Default)]
pub struct FormatRegistry {
    loaders: HashMap<&'static str, Box<dyn Loader>>,
    savers: HashMap<&'static str, Box<dyn Saver>>,
}

impl FormatRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in codec.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register_codec(".npy", NpyCodec);
        registry.register_codec(".npz", NpzCodec);
        registry.register_codec(".nc", NetCdfCodec);
        registry.register_codec(".json", JsonCodec);
        registry.register_codec(".geojson", GeoJsonCodec);
        registry.register_codec(SHP_EXT, ShapefileCodec);
        registry.register_codec(".tif", TiffCodec);
        registry.register_codec(".csv", CsvCodec);
        registry.register_codec(".xlsx", XlsxCodec);
        registry.register_codec(".txt", TextCodec);
        registry.register_codec(".tex", TextCodec);
        registry.register_codec(".md", TextCodec);
        registry.register_saver(ZIP_EXT, FolderArchive);
        registry.register_saver(".png", RawBytes);
        registry
    }

    pub fn register_loader(&mut self, extension: &'static str, loader: impl Loader + 'static) {
        self.loaders.insert(extension, Box::new(loader));
    }

    pub fn register_saver(&mut self, extension: &'static str, saver: impl Saver + 'static) {
        self.savers.insert(extension, Box::new(saver));
    }

    pub fn register_codec<C>(&mut self, extension: &'static str, codec: C)
    where
        C: Loader + Saver + Clone + 'static,
    {
        self.register_loader(extension, codec.clone());
        self.register_saver(extension, codec);
    }

    pub fn can_load(&self, extension: &str) -> bool {
        self.loaders.contains_key(extension)
    }

    pub fn can_save(&self, extension: &str) -> bool {
        self.savers.contains_key(extension)
    }

    pub fn load_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<_> = self.loaders.keys().copied().collect();
        extensions.sort_unstable();
        extensions
    }

    pub fn save_extensions(&self) -> Vec<&'static str> {
        let mut extensions: Vec<_> = self.savers.keys().copied().collect();
        extensions.sort_unstable();
        extensions
    }

    /// Load `path` through `fetch`, which retrieves the raw bytes stored at
    /// the path it is given.
    pub async fn load<F, Fut>(&self, path: &LogicalPath, fetch: F) -> FerryResult<Value>
    where
        F: FnOnce(LogicalPath) -> Fut,
        Fut: Future<Output = FerryResult<Bytes>>,
    {
        let extension = path.suffix().unwrap_or_default();
        let loader = self
            .loaders
            .get(extension)
            .ok_or_else(|| FerryError::unsupported_format(extension, path))?;

        let source = if extension == SHP_EXT {
            path.with_suffix(ZIP_EXT)
        } else {
            path.clone()
        };
        let mode = TransferMode::for_extension(extension);
        debug!(path = %path, source = %source, ?mode, "loading");

        let raw = fetch(source).await?;
        Payload::decode(mode, raw)
            .and_then(|payload| loader.load(payload))
            .map_err(|e| codec_failure("loading", extension, path, e))
    }

    /// Serialise `value` into a scratch directory and hand the file to
    /// `upload` together with the path it must be stored at. Returns that
    /// path, which differs from `path` for `.shp`.
    pub async fn save<F, Fut>(
        &self,
        path: &LogicalPath,
        value: &Value,
        upload: F,
    ) -> FerryResult<LogicalPath>
    where
        F: FnOnce(PathBuf, LogicalPath) -> Fut,
        Fut: Future<Output = FerryResult<u64>>,
    {
        let extension = path.suffix().unwrap_or_default();
        let saver = self
            .savers
            .get(extension)
            .ok_or_else(|| FerryError::unsupported_format(extension, path))?;

        let name = path
            .name()
            .ok_or_else(|| FerryError::InvalidPath(path.to_string()))?;
        let store_path = if extension == SHP_EXT {
            path.with_suffix(ZIP_EXT)
        } else {
            path.clone()
        };
        let store_name = store_path
            .name()
            .ok_or_else(|| FerryError::InvalidPath(store_path.to_string()))?;

        let encoded = saver
            .save(value, name)
            .map_err(|e| codec_failure("saving", extension, path, e))?;

        let scratch = tempfile::tempdir()?;
        let local = scratch.path().join(store_name);
        fs::write(&local, &encoded).await?;
        debug!(path = %store_path, bytes = encoded.len(), "saving");

        upload(local, store_path.clone()).await?;
        Ok(store_path)
    }
}

fn codec_failure(action: &str, extension: &str, path: &LogicalPath, err: FormatError) -> FerryError {
    error!(path = %path, extension, error = %err, "{action} failed");
    FerryError::Codec {
        extension: extension.to_string(),
        message: format!("{action} {path} failed: {err}"),
    }
}
