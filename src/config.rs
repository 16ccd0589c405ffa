// On-disk locations for the store, media library, staging and share directories.
//
// Resolution order for each location:
// 1) Explicit override (CLI flag)
// 2) Environment variable (EMOGO_DATA_DIR, EMOGO_STAGING_DIR, EMOGO_SHARE_DIR)
// 3) Platform defaults from the OS project directories

use std::env;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::constants::{
    APP_NAME, DB_FILENAME, ENV_DATA_DIR, ENV_SHARE_DIR, ENV_STAGING_DIR, LIBRARY_FOLDER,
    SHARE_FOLDER, STAGING_FOLDER,
};
use crate::error::{EmogoError, Result};

/// Caller-supplied overrides, usually straight from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub staging_dir: Option<PathBuf>,
    pub share_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub library_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub share_dir: PathBuf,
}

impl AppConfig {
    /// Build a config rooted at one directory. Everything lives beneath it.
    pub fn rooted_at(data_dir: &Path) -> Self {
        Self {
            data_dir: data_dir.to_path_buf(),
            db_path: data_dir.join(DB_FILENAME),
            library_dir: data_dir.join(LIBRARY_FOLDER),
            staging_dir: data_dir.join(STAGING_FOLDER),
            share_dir: data_dir.join(SHARE_FOLDER),
        }
    }

    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        let project_dirs = ProjectDirs::from("", "", APP_NAME);

        let data_dir = match pick(overrides.data_dir.as_ref(), ENV_DATA_DIR) {
            Some(dir) => dir,
            None => project_dirs
                .as_ref()
                .map(|p| p.data_dir().to_path_buf())
                .ok_or_else(|| EmogoError::Other("Could not determine data directory".to_string()))?,
        };

        let mut config = Self::rooted_at(&data_dir);

        if let Some(dir) = pick(overrides.staging_dir.as_ref(), ENV_STAGING_DIR) {
            config.staging_dir = dir;
        } else if let Some(p) = project_dirs.as_ref() {
            config.staging_dir = p.cache_dir().join(STAGING_FOLDER);
        }

        if let Some(dir) = pick(overrides.share_dir.as_ref(), ENV_SHARE_DIR) {
            config.share_dir = dir;
        }

        Ok(config)
    }

    /// Create the data, library and staging directories. The share directory is
    /// left to the share target, which reports itself unavailable if it cannot create it.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.library_dir, &self.staging_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                EmogoError::Other(format!("Cannot create directory {}: {}", dir.display(), e))
            })?;
        }
        Ok(())
    }
}

fn pick(explicit: Option<&PathBuf>, env_key: &str) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.clone());
    }
    match env::var(env_key) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v)),
        _ => None,
    }
}
