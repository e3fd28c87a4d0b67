//! Database migrations for fake role storage
//!
//! Each migration is applied atomically and tracked in the
//! `fakerole_schema_version` table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

use super::StorageError;

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial fake role schema",
        up_sql: r#"
                CREATE TABLE IF NOT EXISTS fakerole_schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS fake_roles (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS fake_role_members (
                    role_id TEXT NOT NULL,
                    member_id TEXT NOT NULL,            -- snowflake
                    added_at INTEGER NOT NULL,
                    PRIMARY KEY (role_id, member_id),
                    FOREIGN KEY (role_id) REFERENCES fake_roles(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_fake_role_members_member
                    ON fake_role_members(member_id);
            "#,
    }]
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Get current schema version from database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> Result<i32, StorageError> {
    let conn = pool.get()?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS fakerole_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM fakerole_schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> Result<(), StorageError> {
    let current_version = get_current_version(pool)?;

    let pending_migrations: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending_migrations.is_empty() {
        return Ok(());
    }

    let conn = pool.get()?;

    for migration in pending_migrations {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;
        tx.execute(
            "INSERT INTO fakerole_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now_millis()],
        )?;

        tx.commit()?;

        info!(
            version = migration.version,
            description = migration.description,
            "Applied migration"
        );
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}
