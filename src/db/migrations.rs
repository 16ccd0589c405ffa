// Database migrations
// Migrations are forward-only. Never edit or delete a migration after it ships.
//
// Stores written before version tracking existed sit at user_version 0 and may
// already hold a `records` table, with or without the assetId column. Each step
// therefore inspects the live schema instead of assuming a blank database.

use rusqlite::Connection;

use crate::constants::RECORDS_TABLE;
use crate::error::{EmogoError, Result};

struct Migration {
    description: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

/// All migrations in order. Version N is MIGRATIONS[N - 1].
const MIGRATIONS: &[Migration] = &[
    Migration {
        description: "create records table",
        apply: create_records_table,
    },
    Migration {
        description: "add records.assetId",
        apply: add_asset_id_column,
    },
];

fn create_records_table(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            videoUri TEXT NOT NULL,
            sentiment INTEGER NOT NULL,
            latitude REAL,
            longitude REAL,
            timestamp TEXT NOT NULL
        );
        "#,
    )
}

fn add_asset_id_column(conn: &Connection) -> rusqlite::Result<()> {
    if table_has_column(conn, RECORDS_TABLE, "assetId")? {
        return Ok(());
    }
    conn.execute_batch("ALTER TABLE records ADD COLUMN assetId TEXT;")
}

/// Check the live schema for a column.
pub fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|n| n.eq_ignore_ascii_case(column)))
}

/// Highest schema version this build knows how to produce.
pub fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

/// Get current schema version from database
pub fn get_schema_version(conn: &Connection) -> Result<u32> {
    let version: u32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    Ok(version)
}

/// Run all pending migrations. Each step and its version bump commit together.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    let target_version = latest_version();

    // Refuse to open a store written by a newer build
    if current_version > target_version {
        return Err(EmogoError::Storage(format!(
            "Store schema version {} is newer than this build supports (max {})",
            current_version, target_version
        )));
    }

    if current_version == target_version {
        return Ok(());
    }

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let migration_version = (i + 1) as u32;
        if migration_version <= current_version {
            continue;
        }

        let tx = conn.unchecked_transaction()?;
        (migration.apply)(&tx).map_err(|e| {
            EmogoError::Storage(format!(
                "Migration {} ({}) failed: {}",
                migration_version, migration.description, e
            ))
        })?;
        tx.execute_batch(&format!("PRAGMA user_version = {}", migration_version))?;
        tx.commit()?;

        log::info!("Applied migration {}: {}", migration_version, migration.description);
    }

    Ok(())
}
