// Capture hand-off: save the clip into the asset library, then record it.

use std::path::Path;

use crate::assets::AssetLibrary;
use crate::constants::{SENTIMENT_MAX, SENTIMENT_MIN};
use crate::db::RecordStore;
use crate::error::{EmogoError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturedClip {
    pub record_id: i64,
    pub asset_id: String,
    pub video_uri: String,
}

pub fn validate_sentiment(sentiment: i64) -> Result<()> {
    if (SENTIMENT_MIN..=SENTIMENT_MAX).contains(&sentiment) {
        Ok(())
    } else {
        Err(EmogoError::Other(format!(
            "Sentiment must be between {} and {}, got {}",
            SENTIMENT_MIN, SENTIMENT_MAX, sentiment
        )))
    }
}

pub fn capture_clip(
    library: &dyn AssetLibrary,
    store: &RecordStore,
    source: &Path,
    sentiment: i64,
    location: Option<Location>,
) -> Result<CapturedClip> {
    validate_sentiment(sentiment)?;

    let asset = library.create_asset(source)?;
    let record_id = store.insert(
        &asset.uri,
        Some(&asset.id),
        sentiment,
        location.map(|l| l.latitude),
        location.map(|l| l.longitude),
    )?;

    log::info!("Captured record {} (asset {}, mood {})", record_id, asset.id, sentiment);

    Ok(CapturedClip {
        record_id,
        asset_id: asset.id,
        video_uri: asset.uri,
    })
}
