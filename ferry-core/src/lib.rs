//! Ferry Core
//!
//! Core traits, types, and abstractions shared by the storage facade,
//! the format registry, and the migration engine.

pub mod backend;
pub mod config;
pub mod error;
pub mod operations;
pub mod path;
pub mod provider;

pub use backend::{looks_like_directory, BackendClient, StorageBackend, KNOWN_FILE_EXTENSIONS};
pub use config::Settings;
pub use error::{FerryError, FerryResult};
pub use operations::{MoveOptions, Origin};
pub use path::{LogicalPath, PathCodec, StorageKey, DEFAULT_ROOT};
pub use provider::Provider;
