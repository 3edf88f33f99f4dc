//! Zip archives of local folders

use std::io::{Cursor, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{FormatError, FormatResult};
use crate::registry::Saver;
use crate::value::Value;

/// Build an in-memory deflated archive from `(name, content)` entries.
pub fn zip_entries<'a, I>(entries: I) -> FormatResult<Vec<u8>>
where
    I: IntoIterator<Item = (String, &'a [u8])>,
{
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(name, options)?;
        zip.write_all(content)?;
    }
    Ok(zip.finish()?.into_inner())
}

/// Archives a [`Value::Folder`], entries named relative to the folder
#[derive(Debug, Clone, Copy, Default)]
pub struct FolderArchive;

impl FolderArchive {
    fn collect(folder: &Path) -> FormatResult<Vec<(String, Vec<u8>)>> {
        if !folder.is_dir() {
            return Err(FormatError::malformed(format!(
                "{} is not a folder",
                folder.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(folder).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(folder)
                .map_err(|e| FormatError::malformed(e.to_string()))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((name, std::fs::read(entry.path())?));
        }
        Ok(files)
    }
}

impl Saver for FolderArchive {
    fn save(&self, value: &Value, _name: &str) -> FormatResult<Vec<u8>> {
        let folder = match value {
            Value::Folder(folder) => folder,
            other => return Err(other.mismatch("folder")),
        };
        let files = Self::collect(folder)?;
        zip_entries(files.iter().map(|(name, data)| (name.clone(), data.as_slice())))
    }
}
