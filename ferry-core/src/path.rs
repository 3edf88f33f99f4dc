//! Logical paths, storage keys, and the codec between them

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{FerryError, FerryResult};

/// Application root every logical path lives under.
pub const DEFAULT_ROOT: &str = "/app";

/// Last extension of a file name, leading dot included.
///
/// Follows the usual suffix rules: `archive.tar.gz` gives `.gz`, while
/// dot-files such as `.env` and names ending in a dot have no suffix.
pub fn suffix_of(name: &str) -> Option<&str> {
    let idx = name.rfind('.')?;
    if idx == 0 || idx + 1 == name.len() {
        None
    } else {
        Some(&name[idx..])
    }
}

/// Absolute, backend-independent path identifying one file across backends
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct LogicalPath {
    segments: Vec<String>,
}

impl LogicalPath {
    pub fn new(path: impl AsRef<str>) -> Self {
        Self::root().join(path)
    }

    pub fn root() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .fold(Self::root(), |path, seg| path.join(seg))
    }

    pub fn join(&self, name: impl AsRef<str>) -> Self {
        let mut segments = self.segments.clone();
        for part in name.as_ref().split('/').filter(|s| !s.is_empty()) {
            if part == ".." {
                segments.pop();
            } else if part != "." {
                segments.push(part.to_string());
            }
        }
        Self { segments }
    }

    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            let mut segments = self.segments.clone();
            segments.pop();
            Some(Self { segments })
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    pub fn suffix(&self) -> Option<&str> {
        self.name().and_then(suffix_of)
    }

    pub fn stem(&self) -> Option<&str> {
        let name = self.name()?;
        Some(match suffix_of(name) {
            Some(suffix) => &name[..name.len() - suffix.len()],
            None => name,
        })
    }

    /// Replace the suffix, or append one when the name has none.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        match (self.parent(), self.stem()) {
            (Some(parent), Some(stem)) => parent.join(format!("{stem}{suffix}")),
            _ => self.clone(),
        }
    }

    pub fn starts_with(&self, base: &LogicalPath) -> bool {
        self.segments.starts_with(&base.segments)
    }

    /// Segments of `self` below `base`, if `self` lives under it.
    pub fn strip_prefix(&self, base: &LogicalPath) -> Option<&[String]> {
        self.segments.strip_prefix(base.segments.as_slice())
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn to_path_string(&self) -> String {
        if self.segments.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", self.segments.join("/"))
        }
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_path_string())
    }
}

impl From<&str> for LogicalPath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for LogicalPath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<LogicalPath> for String {
    fn from(path: LogicalPath) -> Self {
        path.to_path_string()
    }
}

/// Backend-native object key, a logical path with the root stripped
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into().trim_matches('/').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn name(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|s| !s.is_empty())
    }

    pub fn suffix(&self) -> Option<&str> {
        self.name().and_then(suffix_of)
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StorageKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for StorageKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Converts between logical paths and storage keys for one application root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCodec {
    root: LogicalPath,
}

impl PathCodec {
    pub fn new(root: impl Into<LogicalPath>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &LogicalPath {
        &self.root
    }

    pub fn to_storage_key(&self, path: &LogicalPath) -> FerryResult<StorageKey> {
        let relative = path.strip_prefix(&self.root).ok_or_else(|| {
            debug!(%path, root = %self.root, "path outside the storage root");
            FerryError::InvalidPath(format!("{path} is not under root {}", self.root))
        })?;
        Ok(StorageKey(relative.join("/")))
    }

    pub fn to_logical_path(&self, key: &StorageKey) -> LogicalPath {
        self.root.join(key.as_str())
    }
}

impl Default for PathCodec {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let path = LogicalPath::new("/app/data/docs");
        assert_eq!(path.segments(), ["app", "data", "docs"]);
    }

    #[test]
    fn test_new_handles_empty_segments() {
        let path = LogicalPath::new("//app//data//");
        assert_eq!(path.segments(), ["app", "data"]);
    }

    #[test]
    fn test_root() {
        let root = LogicalPath::root();
        assert!(root.is_root());
        assert_eq!(root.to_path_string(), "/");
    }

    #[test]
    fn test_join_with_dotdot() {
        let path = LogicalPath::new("/app/data/docs");
        assert_eq!(path.join("../maps").segments(), ["app", "data", "maps"]);
        assert_eq!(path.join("./a.csv").segments(), ["app", "data", "docs", "a.csv"]);
    }

    #[test]
    fn test_parent_of_root() {
        assert!(LogicalPath::root().parent().is_none());
        let path = LogicalPath::new("/app/x.csv");
        assert_eq!(path.parent().unwrap(), LogicalPath::new("/app"));
    }

    #[test]
    fn test_suffix_follows_last_extension() {
        assert_eq!(LogicalPath::new("/app/a.csv").suffix(), Some(".csv"));
        assert_eq!(LogicalPath::new("/app/a.npy.npz").suffix(), Some(".npz"));
        assert_eq!(LogicalPath::new("/app/.env").suffix(), None);
        assert_eq!(LogicalPath::new("/app/trailing.").suffix(), None);
        assert_eq!(LogicalPath::new("/app/folder").suffix(), None);
    }

    #[test]
    fn test_stem_and_with_suffix() {
        let path = LogicalPath::new("/app/maps/zone.shp");
        assert_eq!(path.stem(), Some("zone"));
        assert_eq!(path.with_suffix(".zip"), LogicalPath::new("/app/maps/zone.zip"));

        let bare = LogicalPath::new("/app/maps/zone");
        assert_eq!(bare.with_suffix(".zip"), LogicalPath::new("/app/maps/zone.zip"));
    }

    #[test]
    fn test_strip_prefix() {
        let base = LogicalPath::new("/app/data");
        let file = LogicalPath::new("/app/data/sub/x.csv");
        assert_eq!(file.strip_prefix(&base).unwrap(), ["sub", "x.csv"]);
        assert!(base.strip_prefix(&file).is_none());
        assert!(file.starts_with(&base));
    }

    #[test]
    fn test_ordering_is_by_segments() {
        let mut paths = vec![
            LogicalPath::new("/app/b"),
            LogicalPath::new("/app/a/z"),
            LogicalPath::new("/app/a"),
        ];
        paths.sort();
        assert_eq!(
            paths,
            vec![
                LogicalPath::new("/app/a"),
                LogicalPath::new("/app/a/z"),
                LogicalPath::new("/app/b"),
            ]
        );
    }

    #[test]
    fn test_serde_as_string() {
        let path = LogicalPath::new("/app/data/x.csv");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"/app/data/x.csv\"");
        let back: LogicalPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_storage_key_strips_root() {
        let codec = PathCodec::default();
        let key = codec
            .to_storage_key(&LogicalPath::new("/app/tests/data/example.csv"))
            .unwrap();
        assert_eq!(key.as_str(), "tests/data/example.csv");
        assert_eq!(key.suffix(), Some(".csv"));
        assert_eq!(key.name(), Some("example.csv"));
    }

    #[test]
    fn test_storage_key_of_root_is_empty() {
        let codec = PathCodec::default();
        let key = codec.to_storage_key(&LogicalPath::new("/app")).unwrap();
        assert!(key.is_empty());
    }

    #[test]
    fn test_storage_key_outside_root_is_invalid() {
        let codec = PathCodec::default();
        let err = codec
            .to_storage_key(&LogicalPath::new("/srv/data/x.csv"))
            .unwrap_err();
        assert!(matches!(err, FerryError::InvalidPath(_)));
    }

    #[test]
    fn test_codec_bijection() {
        let codec = PathCodec::default();
        for raw in [
            "/app",
            "/app/a.csv",
            "/app/tests/unitary/data/example.json",
            "/app/deep/er/and/deeper/file.tar.gz",
            "/app/no_extension",
        ] {
            let path = LogicalPath::new(raw);
            let key = codec.to_storage_key(&path).unwrap();
            assert_eq!(codec.to_logical_path(&key), path, "round trip of {raw}");
        }
    }

    #[test]
    fn test_codec_with_custom_root() {
        let codec = PathCodec::new("/srv/ferry");
        let path = LogicalPath::new("/srv/ferry/a/b.txt");
        let key = codec.to_storage_key(&path).unwrap();
        assert_eq!(key.as_str(), "a/b.txt");
        assert_eq!(codec.to_logical_path(&key), path);
    }
}
