// End-to-end: capture through the asset library, then export to a share directory.

use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use emogo_lib::assets::LocalAssetLibrary;
use emogo_lib::capture::{capture_clip, Location};
use emogo_lib::export::share::DirectoryShare;
use emogo_lib::fs::{path_to_file_uri, LocalFileSystem};
use emogo_lib::{AppConfig, ExportOrchestrator, ExportOutcome, RecordStore};
use tempfile::TempDir;

fn write_clip(dir: &Path, name: &str, content: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn read_zip(path: &Path) -> (Vec<String>, Vec<serde_json::Value>) {
    let bytes = fs::read(path).unwrap();
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let names = (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect();
    let mut json = String::new();
    zip.by_name("records.json").unwrap().read_to_string(&mut json).unwrap();
    (names, serde_json::from_str(&json).unwrap())
}

#[test]
fn test_capture_and_export_full_history() {
    let tmp = TempDir::new().unwrap();
    let config = AppConfig::rooted_at(&tmp.path().join("data"));
    config.ensure_dirs().unwrap();
    let sources = tmp.path().join("camera");
    fs::create_dir_all(&sources).unwrap();

    let store = RecordStore::new(&config.db_path);
    store.initialize().unwrap();
    store.initialize().unwrap();
    let library = LocalAssetLibrary::new(&config.library_dir);

    // Legacy capture saved by direct path, before the asset library existed
    let legacy_clip = write_clip(&sources, "legacy.mp4", b"legacy-bytes");
    let legacy_id = store
        .insert(&path_to_file_uri(&legacy_clip).unwrap(), None, 2, None, None)
        .unwrap();

    // Library capture whose asset is later deleted
    let purged = capture_clip(
        &library,
        &store,
        &write_clip(&sources, "purged.mp4", b"purged-bytes"),
        5,
        Some(Location { latitude: 24.98, longitude: 121.54 }),
    )
    .unwrap();
    fs::remove_dir_all(config.library_dir.join(&purged.asset_id)).unwrap();

    let kept = capture_clip(
        &library,
        &store,
        &write_clip(&sources, "kept.mp4", b"kept-bytes"),
        3,
        None,
    )
    .unwrap();

    let share = DirectoryShare::new(&config.share_dir);
    let exporter = ExportOrchestrator::new(&store, &library, &LocalFileSystem, &share, &config.staging_dir);

    let summary = match exporter.export_all().unwrap() {
        ExportOutcome::Shared(summary) => summary,
        other => panic!("unexpected outcome {:?}", other),
    };
    assert_eq!(summary.records, 3);
    assert_eq!(summary.embedded, 2);
    assert_eq!(summary.missed, 1);

    // Staging is cleaned, delivery holds the archive
    assert_eq!(fs::read_dir(&config.staging_dir).unwrap().count(), 0);
    let delivered = config.share_dir.join(&summary.archive_name);
    let (names, manifest) = read_zip(&delivered);

    assert_eq!(names.len(), 3);
    assert!(names.contains(&format!("video_{}.mp4", legacy_id)));
    assert!(names.contains(&format!("video_{}.mp4", kept.record_id)));
    assert_eq!(names.last().map(String::as_str), Some("records.json"));

    assert_eq!(manifest.len(), 3);
    let purged_entry = manifest
        .iter()
        .find(|e| e["id"] == purged.record_id)
        .unwrap();
    assert!(purged_entry["exportedVideoPath"].is_null());
    assert_eq!(purged_entry["originalVideoUri"], purged.video_uri.as_str());
    assert_eq!(purged_entry["assetId"], purged.asset_id.as_str());
}

#[test]
fn test_export_with_no_records_delivers_manifest_only() {
    let tmp = TempDir::new().unwrap();
    let config = AppConfig::rooted_at(tmp.path());
    config.ensure_dirs().unwrap();
    let store = RecordStore::new(&config.db_path);
    let library = LocalAssetLibrary::new(&config.library_dir);
    let share = DirectoryShare::new(&config.share_dir);
    let exporter = ExportOrchestrator::new(&store, &library, &LocalFileSystem, &share, &config.staging_dir);

    let summary = match exporter.export_all().unwrap() {
        ExportOutcome::Shared(summary) => summary,
        other => panic!("unexpected outcome {:?}", other),
    };
    let (names, manifest) = read_zip(&config.share_dir.join(&summary.archive_name));
    assert_eq!(names, vec!["records.json"]);
    assert!(manifest.is_empty());
}
