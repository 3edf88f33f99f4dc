//! Built-in codecs, one module per format family

pub mod archive;
pub mod json;
pub mod netcdf;
pub mod numpy;
pub mod raw;
pub mod shapefile;
pub mod tabular;
pub mod text;
pub mod tiff;
