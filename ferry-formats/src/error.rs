//! Codec errors

use thiserror::Error;

/// Failure inside a single codec
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("expected {expected} data, got {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },

    #[error("malformed data: {0}")]
    Malformed(String),

    #[error("not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("npy read error: {0}")]
    NpyRead(#[from] ndarray_npy::ReadNpyError),

    #[error("npy write error: {0}")]
    NpyWrite(#[from] ndarray_npy::WriteNpyError),

    #[error("npz read error: {0}")]
    NpzRead(#[from] ndarray_npy::ReadNpzError),

    #[error("npz write error: {0}")]
    NpzWrite(#[from] ndarray_npy::WriteNpzError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("xlsx read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("xlsx write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type FormatResult<T> = Result<T, FormatError>;

impl FormatError {
    pub fn malformed(message: impl Into<String>) -> Self {
        FormatError::Malformed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_value_display() {
        let err = FormatError::UnexpectedValue {
            expected: "array",
            found: "text",
        };
        assert_eq!(err.to_string(), "expected array data, got text");
    }

    #[test]
    fn test_from_json_error() {
        let err: FormatError = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(matches!(err, FormatError::Json(_)));
    }
}
