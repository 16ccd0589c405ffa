// Archive Builder
// One entry per embedded clip plus a single manifest. Per-record failures are
// collected as values; building never fails.

use std::io::{Cursor, Write};

use serde::Serialize;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use crate::assets::{ResolutionMiss, SourceHandle};
use crate::constants::{media_entry_name, MANIFEST_ENTRY_NAME};
use crate::db::schema::Record;
use crate::error::Result;
use crate::fs::FileSystem;

/// Manifest row: the record as stored, plus where its clip landed in the archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    #[serde(flatten)]
    pub record: Record,
    /// In-archive path, or null when the clip could not be embedded.
    pub exported_video_path: Option<String>,
    /// Kept even when embedding failed, for tracing the clip back to its source.
    pub original_video_uri: String,
}

#[derive(Debug, Clone)]
pub struct MediaEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbedMiss {
    #[error("unresolvable: {0}")]
    Unresolvable(ResolutionMiss),

    #[error("read of {locator} failed: {reason}")]
    ReadFailed { locator: String, reason: String },
}

/// Outcome for one record: the entry name it was embedded under, or why not.
#[derive(Debug, Clone)]
pub struct EmbedReport {
    pub record_id: i64,
    pub result: std::result::Result<String, EmbedMiss>,
}

#[derive(Debug, Clone, Default)]
pub struct Archive {
    media: Vec<MediaEntry>,
    manifest: Vec<ManifestEntry>,
    reports: Vec<EmbedReport>,
}

impl Archive {
    pub fn media(&self) -> &[MediaEntry] {
        &self.media
    }

    pub fn manifest(&self) -> &[ManifestEntry] {
        &self.manifest
    }

    pub fn reports(&self) -> &[EmbedReport] {
        &self.reports
    }

    /// Media entries plus the manifest.
    pub fn entry_count(&self) -> usize {
        self.media.len() + 1
    }

    pub fn embedded_count(&self) -> usize {
        self.media.len()
    }

    pub fn missed_count(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_err()).count()
    }

    /// Entry names in write order: media in record order, manifest last.
    pub fn entry_names(&self) -> Vec<String> {
        self.media
            .iter()
            .map(|m| m.name.clone())
            .chain(std::iter::once(MANIFEST_ENTRY_NAME.to_string()))
            .collect()
    }

    pub fn manifest_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(&self.manifest)?)
    }

    /// Serialize as a zip container. Entry timestamps are pinned to the zip
    /// epoch so equal inputs give identical bytes.
    pub fn to_zip_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        // Clips are already compressed
        let media_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(DateTime::default());
        let manifest_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());

        for entry in &self.media {
            zip.start_file(entry.name.as_str(), media_options)?;
            zip.write_all(&entry.bytes)?;
        }

        zip.start_file(MANIFEST_ENTRY_NAME, manifest_options)?;
        zip.write_all(&self.manifest_json()?)?;

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Build an archive from records in the given order. Each record is resolved
/// and read on its own; a miss drops only that record's clip.
pub fn build<F>(records: &[Record], resolve: F, fs: &dyn FileSystem) -> Archive
where
    F: Fn(&Record) -> std::result::Result<SourceHandle, ResolutionMiss>,
{
    let mut archive = Archive::default();

    for record in records {
        let (result, exported_video_path) = match embed_one(record, &resolve, fs) {
            Ok(entry) => {
                let name = entry.name.clone();
                archive.media.push(entry);
                (Ok(name.clone()), Some(name))
            }
            Err(miss) => {
                log::warn!("Failed to add video for record {}: {}", record.id, miss);
                (Err(miss), None)
            }
        };

        archive.reports.push(EmbedReport {
            record_id: record.id,
            result,
        });
        archive.manifest.push(ManifestEntry {
            record: record.clone(),
            exported_video_path,
            original_video_uri: record.video_uri.clone(),
        });
    }

    log::info!(
        "Built archive: {} records, {} clips embedded, {} missed",
        archive.manifest.len(),
        archive.embedded_count(),
        archive.missed_count()
    );

    archive
}

fn embed_one<F>(record: &Record, resolve: &F, fs: &dyn FileSystem) -> std::result::Result<MediaEntry, EmbedMiss>
where
    F: Fn(&Record) -> std::result::Result<SourceHandle, ResolutionMiss>,
{
    let source = resolve(record).map_err(EmbedMiss::Unresolvable)?;
    let bytes = fs.read(&source.locator).map_err(|e| EmbedMiss::ReadFailed {
        locator: source.locator.clone(),
        reason: e.to_string(),
    })?;

    Ok(MediaEntry {
        name: media_entry_name(record.id),
        bytes,
    })
}
