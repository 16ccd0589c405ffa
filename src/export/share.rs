// Sharing collaborator: hands a finished archive to whatever delivers it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EmogoError, Result};
use crate::fs::locator_to_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOutcome {
    Shared,
    /// The user dismissed the share without delivering.
    Cancelled,
}

pub trait ShareTarget: Send + Sync {
    fn is_available(&self) -> bool;
    fn share(&self, locator: &str) -> Result<ShareOutcome>;
}

/// Delivers archives by copying them into a directory.
#[derive(Debug, Clone)]
pub struct DirectoryShare {
    dir: PathBuf,
}

impl DirectoryShare {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ShareTarget for DirectoryShare {
    fn is_available(&self) -> bool {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            log::warn!("Share directory {} unavailable: {}", self.dir.display(), e);
            return false;
        }
        fs::metadata(&self.dir)
            .map(|m| m.is_dir() && !m.permissions().readonly())
            .unwrap_or(false)
    }

    fn share(&self, locator: &str) -> Result<ShareOutcome> {
        let source = locator_to_path(locator)?;
        let name = source
            .file_name()
            .ok_or_else(|| EmogoError::InvalidLocator(locator.to_string()))?;
        let dest = self.dir.join(name);

        fs::copy(&source, &dest).map_err(|e| {
            EmogoError::Share(format!("Cannot copy archive to {}: {}", dest.display(), e))
        })?;

        log::info!("Archive delivered to {}", dest.display());
        Ok(ShareOutcome::Shared)
    }
}
