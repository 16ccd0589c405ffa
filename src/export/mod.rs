// Emogo - Export Module
// Fetches every record, builds the archive, stages it, hands it to the share
// target and removes the staged file whatever the share outcome.

pub mod archive;
pub mod share;


use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;

use crate::assets::{AssetLibrary, AssetResolver};
use crate::constants::export_file_name;
use crate::db::RecordStore;
use crate::error::{EmogoError, Result};
use crate::fs::{path_to_file_uri, FileSystem};
use share::{ShareOutcome, ShareTarget};

#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub archive_name: String,
    pub records: usize,
    pub embedded: usize,
    pub missed: usize,
    pub archive_bytes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    /// Another export was still running; this request did nothing.
    AlreadyRunning,
    Shared(ExportSummary),
    Cancelled(ExportSummary),
}

pub struct ExportOrchestrator<'a> {
    store: &'a RecordStore,
    library: &'a dyn AssetLibrary,
    fs: &'a dyn FileSystem,
    share: &'a dyn ShareTarget,
    staging_dir: PathBuf,
    in_flight: AtomicBool,
}

impl<'a> ExportOrchestrator<'a> {
    pub fn new(
        store: &'a RecordStore,
        library: &'a dyn AssetLibrary,
        fs: &'a dyn FileSystem,
        share: &'a dyn ShareTarget,
        staging_dir: &Path,
    ) -> Self {
        Self {
            store,
            library,
            fs,
            share,
            staging_dir: staging_dir.to_path_buf(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Export the full history as one archive. A call made while another is
    /// running returns `AlreadyRunning` without touching anything.
    pub fn export_all(&self) -> Result<ExportOutcome> {
        let _guard = match InFlightGuard::acquire(&self.in_flight) {
            Some(guard) => guard,
            None => {
                log::warn!("Export already in progress; request ignored");
                return Ok(ExportOutcome::AlreadyRunning);
            }
        };

        if !self.share.is_available() {
            log::warn!("Sharing unavailable; export aborted before staging");
            return Err(EmogoError::SharingUnavailable);
        }

        let records = self.store.try_fetch_all()?;
        let resolver = AssetResolver::new(self.library);
        let archive = archive::build(&records, |record| resolver.resolve(record), self.fs);
        let bytes = archive.to_zip_bytes()?;

        self.fs.create_dir_all(&path_to_file_uri(&self.staging_dir)?)?;
        let archive_name = export_file_name(Utc::now().timestamp_millis());
        let staged = TransientFile::new(self.fs, path_to_file_uri(&self.staging_dir.join(&archive_name))?);

        self.fs.write(staged.locator(), &bytes)?;
        log::info!("Staged {} ({} bytes)", archive_name, bytes.len());

        let summary = ExportSummary {
            archive_name,
            records: records.len(),
            embedded: archive.embedded_count(),
            missed: archive.missed_count(),
            archive_bytes: bytes.len(),
        };

        // `staged` is removed on every path out of here, unwinding included
        match self.share.share(staged.locator()) {
            Ok(ShareOutcome::Shared) => Ok(ExportOutcome::Shared(summary)),
            Ok(ShareOutcome::Cancelled) => {
                log::info!("Share cancelled by user");
                Ok(ExportOutcome::Cancelled(summary))
            }
            Err(e) => {
                log::error!("Share failed: {}", e);
                Err(match e {
                    EmogoError::Share(_) => e,
                    other => EmogoError::Share(other.to_string()),
                })
            }
        }
    }
}

/// Holds the in-flight flag for the duration of one export.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Staged archive, deleted on drop. Cleanup failures are logged and dropped.
struct TransientFile<'a> {
    fs: &'a dyn FileSystem,
    locator: String,
}

impl<'a> TransientFile<'a> {
    fn new(fs: &'a dyn FileSystem, locator: String) -> Self {
        Self { fs, locator }
    }

    fn locator(&self) -> &str {
        &self.locator
    }
}

impl Drop for TransientFile<'_> {
    fn drop(&mut self) {
        match self.fs.delete(&self.locator) {
            Ok(()) => log::debug!("Removed staged archive {}", self.locator),
            Err(e) => log::warn!("Cleanup error for {}: {}", self.locator, e),
        }
    }
}
