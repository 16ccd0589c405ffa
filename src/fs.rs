// Byte-level file access over locators (`file://` URIs or bare paths)

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use url::Url;

use crate::constants::{CONTENT_URI_SCHEME, TEMP_FILE_PREFIX};
use crate::error::{EmogoError, Result};

pub trait FileSystem: Send + Sync {
    fn read(&self, locator: &str) -> Result<Vec<u8>>;
    fn write(&self, locator: &str, bytes: &[u8]) -> Result<()>;
    /// Removing something already absent is not an error.
    fn delete(&self, locator: &str) -> Result<()>;
    /// Create a directory and any missing parents.
    fn create_dir_all(&self, locator: &str) -> Result<()>;
}

/// Local disk. Content-provider locators have no backing store here and are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn read(&self, locator: &str) -> Result<Vec<u8>> {
        let path = locator_to_path(locator)?;
        Ok(fs::read(path)?)
    }

    /// Bytes land in a sibling temp file first. The temp file is removed on
    /// every failure, partial writes included.
    fn write(&self, locator: &str, bytes: &[u8]) -> Result<()> {
        let path = locator_to_path(locator)?;
        let parent = match path.parent() {
            Some(p) if path.file_name().is_some() => p,
            _ => return Err(EmogoError::InvalidLocator(locator.to_string())),
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| EmogoError::Io(e.error))?;
        Ok(())
    }

    fn delete(&self, locator: &str) -> Result<()> {
        let path = locator_to_path(locator)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(EmogoError::Io(e)),
        }
    }

    fn create_dir_all(&self, locator: &str) -> Result<()> {
        let path = locator_to_path(locator)?;
        Ok(fs::create_dir_all(path)?)
    }
}

/// Percent-encoded `file://` URI for a path. Relative paths are anchored at
/// the current directory.
pub fn path_to_file_uri(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| EmogoError::InvalidLocator(absolute.display().to_string()))
}

/// Map a locator onto the local filesystem.
pub fn locator_to_path(locator: &str) -> Result<PathBuf> {
    if locator.starts_with(CONTENT_URI_SCHEME) {
        return Err(EmogoError::InvalidLocator(format!(
            "{} (no content provider on this platform)",
            locator
        )));
    }
    if locator.is_empty() {
        return Err(EmogoError::InvalidLocator(locator.to_string()));
    }

    match Url::parse(locator) {
        Ok(url) if url.scheme() == "file" => {
            if url.path() == "/" {
                return Err(EmogoError::InvalidLocator(locator.to_string()));
            }
            url.to_file_path()
                .map_err(|_| EmogoError::InvalidLocator(locator.to_string()))
        }
        Ok(_) => Err(EmogoError::InvalidLocator(locator.to_string())),
        // No scheme: a plain path
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(PathBuf::from(locator)),
        Err(_) => Err(EmogoError::InvalidLocator(locator.to_string())),
    }
}
