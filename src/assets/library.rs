// Directory-backed asset library
// Each asset lives in its own folder: <root>/<asset id>/<original file name>.
// Generic locators use the opaque library scheme; only the local copy is readable.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{AssetInfo, AssetLibrary, CreatedAsset};
use crate::constants::{LIBRARY_URI_SCHEME, TEMP_FILE_PREFIX};
use crate::error::{EmogoError, Result};
use crate::fs::path_to_file_uri;

#[derive(Debug, Clone)]
pub struct LocalAssetLibrary {
    root: PathBuf,
}

impl LocalAssetLibrary {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn asset_dir(&self, asset_id: &str) -> Result<PathBuf> {
        let valid = !asset_id.is_empty()
            && asset_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(EmogoError::AssetLibrary(format!("Invalid asset id: {:?}", asset_id)));
        }
        Ok(self.root.join(asset_id))
    }
}

impl AssetLibrary for LocalAssetLibrary {
    fn get_asset_info(&self, asset_id: &str) -> Result<Option<AssetInfo>> {
        let dir = self.asset_dir(asset_id)?;
        if !dir.is_dir() {
            return Ok(None);
        }

        let mut local: Option<PathBuf> = None;
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(TEMP_FILE_PREFIX) || !entry.file_type()?.is_file() {
                continue;
            }
            local = Some(entry.path());
            break;
        }

        Ok(Some(AssetInfo {
            local_uri: local.map(|p| path_to_file_uri(&p)).transpose()?,
            uri: Some(format!("{}{}", LIBRARY_URI_SCHEME, asset_id)),
        }))
    }

    fn create_asset(&self, source: &Path) -> Result<CreatedAsset> {
        let filename = source
            .file_name()
            .ok_or_else(|| EmogoError::AssetLibrary(format!("No filename: {}", source.display())))?
            .to_string_lossy()
            .to_string();

        let id = Uuid::new_v4().to_string().to_uppercase();
        let dir = self.asset_dir(&id)?;
        fs::create_dir_all(&dir)?;

        let dest = dir.join(&filename);
        copy_with_verify(source, &dest).map_err(|e| {
            let _ = fs::remove_dir_all(&dir);
            e
        })?;

        log::info!("Saved {} to asset library as {}", source.display(), id);

        Ok(CreatedAsset {
            uri: format!("{}{}", LIBRARY_URI_SCHEME, id),
            id,
        })
    }
}

/// Copy through a temp name, confirm the length, then rename into place.
fn copy_with_verify(source: &Path, dest: &Path) -> Result<()> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| EmogoError::AssetLibrary(format!("No filename: {}", dest.display())))?
        .to_string_lossy()
        .to_string();
    let tmp = dest.with_file_name(format!("{}{}", TEMP_FILE_PREFIX, file_name));

    let expected = fs::metadata(source)?.len();
    let copied = fs::copy(source, &tmp)?;
    let on_disk = fs::metadata(&tmp)?.len();

    if copied != expected || on_disk != expected {
        let _ = fs::remove_file(&tmp);
        return Err(EmogoError::AssetLibrary(format!(
            "Copy of {} incomplete: {} of {} bytes",
            source.display(),
            on_disk,
            expected
        )));
    }

    fs::rename(&tmp, dest)?;
    Ok(())
}
