// Database schema types and query helpers

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;

use crate::error::Result;

// ----- Record -----

/// One mood capture. Immutable once inserted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    /// Library locator, direct file/content locator, or empty for legacy rows.
    pub video_uri: String,
    pub asset_id: Option<String>,
    pub sentiment: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct NewRecord {
    pub video_uri: String,
    pub asset_id: Option<String>,
    pub sentiment: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

const RECORD_COLUMNS: &str = "id, videoUri, assetId, sentiment, latitude, longitude, timestamp";

fn row_to_record(row: &Row) -> rusqlite::Result<Record> {
    Ok(Record {
        id: row.get(0)?,
        video_uri: row.get(1)?,
        asset_id: row.get(2)?,
        sentiment: row.get(3)?,
        latitude: row.get(4)?,
        longitude: row.get(5)?,
        timestamp: row.get(6)?,
    })
}

/// Current time in the stored format. Fixed-width millis with a `Z` suffix,
/// so string order is chronological order.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn insert_record(conn: &Connection, record: &NewRecord) -> Result<i64> {
    insert_record_at(conn, record, &now_timestamp())
}

/// Insert with an explicit timestamp. Used by insert_record and by tests that
/// need controlled ordering.
pub fn insert_record_at(conn: &Connection, record: &NewRecord, timestamp: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO records (videoUri, assetId, sentiment, latitude, longitude, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            record.video_uri,
            record.asset_id,
            record.sentiment,
            record.latitude,
            record.longitude,
            timestamp,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// All records, most recent first. Equal timestamps fall back to higher id first.
pub fn list_records(conn: &Connection) -> Result<Vec<Record>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM records ORDER BY timestamp DESC, id DESC",
        RECORD_COLUMNS
    ))?;

    let records = stmt
        .query_map([], row_to_record)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(records)
}

pub fn count_records(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
    Ok(count)
}
