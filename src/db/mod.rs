// Record Store
// Owns the SQLite connection for the process. Lifecycle is
// Uninitialized -> Initializing (under the lock) -> Ready; Ready lasts until
// the process exits and there is no teardown.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::constants::DB_BUSY_TIMEOUT_MS;
use crate::error::{EmogoError, Result};
use schema::{NewRecord, Record};

#[derive(Debug, Clone)]
enum StoreLocation {
    File(PathBuf),
    Memory,
}

pub struct RecordStore {
    location: StoreLocation,
    conn: Mutex<Option<Connection>>,
}

impl RecordStore {
    /// Store backed by a file. Nothing is opened until first use.
    pub fn new(db_path: &Path) -> Self {
        Self {
            location: StoreLocation::File(db_path.to_path_buf()),
            conn: Mutex::new(None),
        }
    }

    /// Private in-memory store, mostly for tests.
    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            conn: Mutex::new(None),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| EmogoError::Storage("Record store lock poisoned".to_string()))
    }

    /// Open the store and bring its schema up to date. Safe to call any number
    /// of times; once Ready it returns immediately.
    pub fn initialize(&self) -> Result<()> {
        let mut guard = self.lock()?;
        if guard.is_some() {
            return Ok(());
        }

        let conn = open_connection(&self.location).map_err(|e| {
            log::error!("Error initializing record store: {}", e);
            e
        })?;
        migrations::run_migrations(&conn).map_err(|e| {
            log::error!("Error migrating record store: {}", e);
            e
        })?;

        *guard = Some(conn);
        log::info!("Record store initialized");
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.initialize()?;
        let guard = self.lock()?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| EmogoError::Storage("Record store is not initialized".to_string()))?;
        f(conn)
    }

    /// Persist a capture and return its id. The timestamp is stamped here.
    /// Range checks on sentiment and location are the caller's job.
    pub fn insert(
        &self,
        video_uri: &str,
        asset_id: Option<&str>,
        sentiment: i64,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<i64> {
        let record = NewRecord {
            video_uri: video_uri.to_string(),
            asset_id: asset_id.map(str::to_string),
            sentiment,
            latitude,
            longitude,
        };

        let id = self
            .with_conn(|conn| schema::insert_record(conn, &record))
            .map_err(|e| {
                log::error!("Error inserting record: {}", e);
                into_storage(e)
            })?;

        log::debug!("Inserted record {}", id);
        Ok(id)
    }

    /// All records, most recent first. A store that cannot be read yields an
    /// empty list; the failure is logged.
    pub fn fetch_all(&self) -> Vec<Record> {
        match self.try_fetch_all() {
            Ok(records) => records,
            Err(e) => {
                log::error!("Error fetching records: {}", e);
                Vec::new()
            }
        }
    }

    /// Same ordering as fetch_all, but read failures are returned.
    pub fn try_fetch_all(&self) -> Result<Vec<Record>> {
        self.with_conn(schema::list_records).map_err(into_storage)
    }

    pub fn count(&self) -> Result<i64> {
        self.with_conn(schema::count_records).map_err(into_storage)
    }

    #[cfg(test)]
    pub(crate) fn insert_at(&self, record: &NewRecord, timestamp: &str) -> Result<i64> {
        self.with_conn(|conn| schema::insert_record_at(conn, record, timestamp))
    }
}

fn into_storage(err: EmogoError) -> EmogoError {
    match err {
        EmogoError::Storage(_) => err,
        other => EmogoError::Storage(other.to_string()),
    }
}

fn open_connection(location: &StoreLocation) -> Result<Connection> {
    match location {
        StoreLocation::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    EmogoError::Storage(format!(
                        "Cannot create store directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
            let conn = Connection::open(path)
                .map_err(|e| EmogoError::Storage(format!("Cannot open {}: {}", path.display(), e)))?;

            // WAL for a reader alongside the single writer
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch(&format!("PRAGMA busy_timeout = {};", DB_BUSY_TIMEOUT_MS))?;
            Ok(conn)
        }
        StoreLocation::Memory => Ok(Connection::open_in_memory()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_record(uri: &str, sentiment: i64) -> NewRecord {
        NewRecord {
            video_uri: uri.to_string(),
            asset_id: None,
            sentiment,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn test_initialize_twice_is_noop() {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::new(&tmp.path().join("emogo.db"));
        assert!(!store.is_ready());

        store.initialize().unwrap();
        let id = store.insert("file:///a.mp4", None, 3, None, None).unwrap();
        store.initialize().unwrap();

        assert!(store.is_ready());
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.fetch_all()[0].id, id);
    }

    #[test]
    fn test_reopen_keeps_data() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("emogo.db");
        {
            let store = RecordStore::new(&path);
            store.insert("file:///a.mp4", Some("asset-1"), 5, Some(25.03), Some(121.56)).unwrap();
        }

        let store = RecordStore::new(&path);
        store.initialize().unwrap();
        let records = store.fetch_all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].asset_id.as_deref(), Some("asset-1"));
        assert_eq!(records[0].latitude, Some(25.03));
        assert_eq!(records[0].longitude, Some(121.56));
    }

    #[test]
    fn test_insert_initializes_lazily() {
        let store = RecordStore::in_memory();
        let id = store.insert("file:///a.mp4", None, 1, None, None).unwrap();
        assert!(store.is_ready());
        assert!(id > 0);
    }

    #[test]
    fn test_ids_increase_and_timestamp_is_stamped() {
        let store = RecordStore::in_memory();
        let first = store.insert("file:///a.mp4", None, 1, None, None).unwrap();
        let second = store.insert("file:///b.mp4", None, 2, None, None).unwrap();
        assert!(second > first);

        for record in store.fetch_all() {
            assert!(chrono::DateTime::parse_from_rfc3339(&record.timestamp).is_ok());
            assert!(record.timestamp.ends_with('Z'));
        }
    }

    #[test]
    fn test_fetch_all_orders_by_timestamp_desc() {
        let store = RecordStore::in_memory();
        store.insert_at(&new_record("file:///1.mp4", 2), "2024-05-01T08:00:00.000Z").unwrap();
        store.insert_at(&new_record("file:///2.mp4", 5), "2024-05-01T12:00:00.000Z").unwrap();
        store.insert_at(&new_record("file:///3.mp4", 3), "2024-05-01T20:00:00.000Z").unwrap();

        let sentiments: Vec<i64> = store.fetch_all().iter().map(|r| r.sentiment).collect();
        assert_eq!(sentiments, vec![3, 5, 2]);
    }

    #[test]
    fn test_timestamp_ties_break_by_higher_id() {
        let store = RecordStore::in_memory();
        let ts = "2024-05-01T08:00:00.000Z";
        let a = store.insert_at(&new_record("file:///a.mp4", 1), ts).unwrap();
        let b = store.insert_at(&new_record("file:///b.mp4", 2), ts).unwrap();
        let c = store.insert_at(&new_record("file:///c.mp4", 3), ts).unwrap();

        let ids: Vec<i64> = store.fetch_all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![c, b, a]);
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        // Rows are never deleted through the store, but AUTOINCREMENT must still
        // hold if the file is edited externally.
        let store = RecordStore::in_memory();
        let first = store.insert("file:///a.mp4", None, 1, None, None).unwrap();
        store
            .with_conn(|conn| {
                conn.execute("DELETE FROM records WHERE id = ?1", [first])?;
                Ok(())
            })
            .unwrap();
        let second = store.insert("file:///b.mp4", None, 1, None, None).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_empty_store_fetches_empty() {
        let store = RecordStore::in_memory();
        assert!(store.fetch_all().is_empty());
    }

    #[test]
    fn test_unreadable_store_degrades_to_empty_but_insert_fails() {
        let tmp = TempDir::new().unwrap();
        // A directory where the database file should be cannot be opened
        let path = tmp.path().join("emogo.db");
        std::fs::create_dir_all(&path).unwrap();
        let store = RecordStore::new(&path);

        assert!(store.fetch_all().is_empty());
        assert!(store.try_fetch_all().is_err());
        let err = store.insert("file:///a.mp4", None, 3, None, None).unwrap_err();
        assert!(matches!(err, EmogoError::Storage(_)));
        assert!(!store.is_ready());
    }
}
