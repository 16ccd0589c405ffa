// Asset resolution
// Turns a record's stored reference into a readable locator, or a definitive miss.
// Nothing is cached: library locators can change between runs, so every call
// goes back to the asset library.

pub mod library;

use std::path::Path;

use thiserror::Error;

use crate::constants::{DIRECT_URI_SCHEMES, LIBRARY_URI_SCHEME};
use crate::db::schema::Record;
use crate::error::Result;

pub use library::LocalAssetLibrary;

/// What the asset library knows about one asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetInfo {
    /// Locator of a local copy, when one exists.
    pub local_uri: Option<String>,
    /// Generic locator. May use the library's opaque scheme.
    pub uri: Option<String>,
}

/// Returned when a clip is saved into the library.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedAsset {
    pub uri: String,
    pub id: String,
}

/// External asset-management collaborator.
pub trait AssetLibrary: Send + Sync {
    /// `Ok(None)` means the library has no such asset (deleted or purged).
    fn get_asset_info(&self, asset_id: &str) -> Result<Option<AssetInfo>>;
    fn create_asset(&self, source: &Path) -> Result<CreatedAsset>;
}

/// How a record addresses its clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaSource<'a> {
    /// Saved through the asset library. `fallback` is the record's own direct
    /// locator, used only if the library lookup itself fails.
    LibraryAsset {
        asset_id: &'a str,
        fallback: Option<&'a str>,
    },
    DirectLocator(&'a str),
    Unset,
}

impl<'a> MediaSource<'a> {
    pub fn of(record: &'a Record) -> Self {
        let direct = Some(record.video_uri.as_str()).filter(|uri| is_direct_locator(uri));
        match record.asset_id.as_deref() {
            Some(asset_id) if !asset_id.is_empty() => MediaSource::LibraryAsset {
                asset_id,
                fallback: direct,
            },
            _ => match direct {
                Some(uri) => MediaSource::DirectLocator(uri),
                None => MediaSource::Unset,
            },
        }
    }
}

pub fn is_direct_locator(uri: &str) -> bool {
    DIRECT_URI_SCHEMES.iter().any(|scheme| uri.starts_with(scheme))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    LibraryLocal,
    LibraryGeneric,
    Direct,
}

/// A locator the filesystem collaborator can read.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceHandle {
    pub locator: String,
    pub origin: SourceOrigin,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionMiss {
    #[error("record has no usable video reference")]
    NoReference,

    #[error("asset {0} is no longer in the library")]
    AssetMissing(String),

    #[error("asset {0} has no readable locator")]
    NoUsableLocator(String),

    #[error("lookup of asset {asset_id} failed: {reason}")]
    LookupFailed { asset_id: String, reason: String },
}

pub struct AssetResolver<'a> {
    library: &'a dyn AssetLibrary,
}

impl<'a> AssetResolver<'a> {
    pub fn new(library: &'a dyn AssetLibrary) -> Self {
        Self { library }
    }

    /// First success wins: library local copy, library generic locator (unless
    /// it uses the opaque scheme), then the record's direct locator.
    pub fn resolve(&self, record: &Record) -> std::result::Result<SourceHandle, ResolutionMiss> {
        match MediaSource::of(record) {
            MediaSource::LibraryAsset { asset_id, fallback } => {
                match self.library.get_asset_info(asset_id) {
                    Ok(Some(info)) => from_asset_info(asset_id, info),
                    Ok(None) => Err(ResolutionMiss::AssetMissing(asset_id.to_string())),
                    Err(e) => {
                        log::warn!(
                            "Asset lookup failed for record {} (asset {}): {}",
                            record.id,
                            asset_id,
                            e
                        );
                        match fallback {
                            Some(uri) => Ok(direct(uri)),
                            None => Err(ResolutionMiss::LookupFailed {
                                asset_id: asset_id.to_string(),
                                reason: e.to_string(),
                            }),
                        }
                    }
                }
            }
            MediaSource::DirectLocator(uri) => Ok(direct(uri)),
            MediaSource::Unset => Err(ResolutionMiss::NoReference),
        }
    }
}

fn from_asset_info(asset_id: &str, info: AssetInfo) -> std::result::Result<SourceHandle, ResolutionMiss> {
    if let Some(local) = info.local_uri.filter(|u| !u.is_empty()) {
        return Ok(SourceHandle {
            locator: local,
            origin: SourceOrigin::LibraryLocal,
        });
    }
    match info.uri {
        Some(uri) if !uri.is_empty() && !uri.starts_with(LIBRARY_URI_SCHEME) => Ok(SourceHandle {
            locator: uri,
            origin: SourceOrigin::LibraryGeneric,
        }),
        _ => Err(ResolutionMiss::NoUsableLocator(asset_id.to_string())),
    }
}

fn direct(uri: &str) -> SourceHandle {
    SourceHandle {
        locator: uri.to_string(),
        origin: SourceOrigin::Direct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmogoError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Library fake: ids map to info, `None` entries are missing assets,
    /// ids in `failing` raise.
    #[derive(Default)]
    struct FakeLibrary {
        assets: HashMap<String, Option<AssetInfo>>,
        failing: Vec<String>,
        lookups: AtomicUsize,
    }

    impl AssetLibrary for FakeLibrary {
        fn get_asset_info(&self, asset_id: &str) -> Result<Option<AssetInfo>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            if self.failing.iter().any(|f| f == asset_id) {
                return Err(EmogoError::AssetLibrary("permission revoked".to_string()));
            }
            Ok(self.assets.get(asset_id).cloned().flatten())
        }

        fn create_asset(&self, _source: &Path) -> Result<CreatedAsset> {
            Err(EmogoError::AssetLibrary("read-only".to_string()))
        }
    }

    fn record(video_uri: &str, asset_id: Option<&str>) -> Record {
        Record {
            id: 7,
            video_uri: video_uri.to_string(),
            asset_id: asset_id.map(str::to_string),
            sentiment: 3,
            latitude: None,
            longitude: None,
            timestamp: "2024-05-01T08:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_media_source_variants() {
        let r = record("ph://ABC", Some("ABC"));
        assert_eq!(
            MediaSource::of(&r),
            MediaSource::LibraryAsset { asset_id: "ABC", fallback: None }
        );

        let r = record("file:///a.mp4", Some("ABC"));
        assert_eq!(
            MediaSource::of(&r),
            MediaSource::LibraryAsset { asset_id: "ABC", fallback: Some("file:///a.mp4") }
        );

        let r = record("content://media/9", None);
        assert_eq!(MediaSource::of(&r), MediaSource::DirectLocator("content://media/9"));

        let r = record("ph://ABC", None);
        assert_eq!(MediaSource::of(&r), MediaSource::Unset);

        let r = record("", Some(""));
        assert_eq!(MediaSource::of(&r), MediaSource::Unset);
    }

    #[test]
    fn test_local_uri_preferred() {
        let mut lib = FakeLibrary::default();
        lib.assets.insert(
            "ABC".into(),
            Some(AssetInfo {
                local_uri: Some("file:///lib/ABC/clip.mp4".into()),
                uri: Some("file:///other.mp4".into()),
            }),
        );
        let handle = AssetResolver::new(&lib).resolve(&record("ph://ABC", Some("ABC"))).unwrap();
        assert_eq!(handle.locator, "file:///lib/ABC/clip.mp4");
        assert_eq!(handle.origin, SourceOrigin::LibraryLocal);
    }

    #[test]
    fn test_generic_uri_used_unless_opaque() {
        let mut lib = FakeLibrary::default();
        lib.assets.insert(
            "A".into(),
            Some(AssetInfo { local_uri: None, uri: Some("content://media/1".into()) }),
        );
        lib.assets.insert(
            "B".into(),
            Some(AssetInfo { local_uri: None, uri: Some("ph://B".into()) }),
        );
        let resolver = AssetResolver::new(&lib);

        let handle = resolver.resolve(&record("ph://A", Some("A"))).unwrap();
        assert_eq!(handle.origin, SourceOrigin::LibraryGeneric);

        let miss = resolver.resolve(&record("ph://B", Some("B"))).unwrap_err();
        assert_eq!(miss, ResolutionMiss::NoUsableLocator("B".into()));
    }

    #[test]
    fn test_asset_id_takes_precedence_over_direct_reference() {
        // Purged asset: the direct reference is not tried
        let mut lib = FakeLibrary::default();
        lib.assets.insert("GONE".into(), None);
        let miss = AssetResolver::new(&lib)
            .resolve(&record("file:///still-here.mp4", Some("GONE")))
            .unwrap_err();
        assert_eq!(miss, ResolutionMiss::AssetMissing("GONE".into()));
    }

    #[test]
    fn test_lookup_failure_falls_through_to_direct() {
        let lib = FakeLibrary {
            failing: vec!["ABC".into()],
            ..Default::default()
        };
        let resolver = AssetResolver::new(&lib);

        let handle = resolver.resolve(&record("file:///a.mp4", Some("ABC"))).unwrap();
        assert_eq!(handle.locator, "file:///a.mp4");
        assert_eq!(handle.origin, SourceOrigin::Direct);

        let miss = resolver.resolve(&record("ph://ABC", Some("ABC"))).unwrap_err();
        assert!(matches!(miss, ResolutionMiss::LookupFailed { .. }));
    }

    #[test]
    fn test_unset_reference_is_unresolvable() {
        let lib = FakeLibrary::default();
        let resolver = AssetResolver::new(&lib);
        assert_eq!(resolver.resolve(&record("", None)).unwrap_err(), ResolutionMiss::NoReference);
        assert_eq!(
            resolver.resolve(&record("https://example.com/a.mp4", None)).unwrap_err(),
            ResolutionMiss::NoReference
        );
        assert_eq!(lib.lookups.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_no_caching_between_calls() {
        let mut lib = FakeLibrary::default();
        lib.assets.insert(
            "ABC".into(),
            Some(AssetInfo { local_uri: Some("file:///a.mp4".into()), uri: None }),
        );
        let resolver = AssetResolver::new(&lib);
        let r = record("ph://ABC", Some("ABC"));
        resolver.resolve(&r).unwrap();
        resolver.resolve(&r).unwrap();
        assert_eq!(lib.lookups.load(Ordering::SeqCst), 2);
    }
}
