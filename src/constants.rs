// Emogo Constants
// Archive and store names are read by other tools. Do not change without a manifest review.

// Paths
pub const APP_NAME: &str = "emogo";
pub const DB_FILENAME: &str = "emogo.db";
pub const LIBRARY_FOLDER: &str = "library";
pub const STAGING_FOLDER: &str = "staging";
pub const SHARE_FOLDER: &str = "exports";
pub const TEMP_FILE_PREFIX: &str = ".emogo_tmp_";

// Environment overrides
pub const ENV_DATA_DIR: &str = "EMOGO_DATA_DIR";
pub const ENV_STAGING_DIR: &str = "EMOGO_STAGING_DIR";
pub const ENV_SHARE_DIR: &str = "EMOGO_SHARE_DIR";
pub const ENV_LOG: &str = "EMOGO_LOG";

// Store
pub const RECORDS_TABLE: &str = "records";
pub const DB_BUSY_TIMEOUT_MS: u32 = 5000;

// Sentiment scale (inclusive)
pub const SENTIMENT_MIN: i64 = 1;
pub const SENTIMENT_MAX: i64 = 5;

// Locator schemes
pub const LIBRARY_URI_SCHEME: &str = "ph://";
pub const FILE_URI_SCHEME: &str = "file://";
pub const CONTENT_URI_SCHEME: &str = "content://";
pub const DIRECT_URI_SCHEMES: [&str; 2] = [FILE_URI_SCHEME, CONTENT_URI_SCHEME];

// Archive layout
pub const EXPORT_FILE_PREFIX: &str = "emogo_export_";
pub const EXPORT_FILE_EXTENSION: &str = "zip";
pub const MANIFEST_ENTRY_NAME: &str = "records.json";
pub const MEDIA_ENTRY_PREFIX: &str = "video_";
pub const MEDIA_ENTRY_EXTENSION: &str = "mp4";

/// Archive entry name for a record's embedded clip.
pub fn media_entry_name(record_id: i64) -> String {
    format!("{}{}.{}", MEDIA_ENTRY_PREFIX, record_id, MEDIA_ENTRY_EXTENSION)
}

/// Transient archive file name. The millisecond suffix keeps it apart from a
/// previous export whose cleanup has not run yet.
pub fn export_file_name(unix_millis: i64) -> String {
    format!("{}{}.{}", EXPORT_FILE_PREFIX, unix_millis, EXPORT_FILE_EXTENSION)
}
