//! Ferry Formats
//!
//! Load and save typed data by file extension. The [`FormatRegistry`] maps
//! each supported extension to a codec; storage backends only ever see the
//! encoded bytes.

pub mod codecs;
pub mod error;
pub mod registry;
pub mod value;

pub use codecs::netcdf::{Attribute, Dataset, Dimension, NcData, Variable};
pub use error::{FormatError, FormatResult};
pub use registry::{FormatRegistry, Loader, Payload, Saver, TransferMode, BINARY_EXTENSIONS};
pub use value::{Raster, Sheet, Table, Value};
