//! SQL-based storage implementation for fake roles

use super::migrations::{migrate, now_millis};
use super::{GroupRecord, StorageBackend, StorageError};
use crate::config::StorageConfig;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::debug;

/// SQLite-backed group storage
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteBackend {
    /// Create a backend on an existing pool, running pending migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> Result<Self, StorageError> {
        migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) a database file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let pool = Pool::new(Self::manager(SqliteConnectionManager::file(path)))?;
        Self::new(pool)
    }

    /// Open the database described by the storage configuration
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        debug!(path = %config.database_path.display(), "Opening SQLite backend");
        if let Some(parent) = config.database_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Backend(format!("creating {}: {}", parent.display(), e)))?;
        }
        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .connection_timeout(config.connection_timeout)
            .build(Self::manager(SqliteConnectionManager::file(&config.database_path)))?;
        Self::new(pool)
    }

    /// Create a private in-memory database.
    ///
    /// The pool holds a single connection: every SQLite memory connection is
    /// its own database.
    pub fn memory() -> Result<Self, StorageError> {
        let pool = Pool::builder()
            .max_size(1)
            .build(Self::manager(SqliteConnectionManager::memory()))?;
        Self::new(pool)
    }

    fn manager(manager: SqliteConnectionManager) -> SqliteConnectionManager {
        manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"))
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StorageError> {
        Ok(self.pool.get()?)
    }
}

impl StorageBackend for SqliteBackend {
    fn create_group(
        &self,
        id: &str,
        name: &str,
        members: &BTreeSet<String>,
    ) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = now_millis();

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO fake_roles (id, name, created_at, updated_at)
             VALUES (?, ?, ?, ?)",
            params![id, name, now, now],
        )?;
        if inserted == 0 {
            return Err(StorageError::AlreadyExists(id.to_string()));
        }

        for member in members {
            tx.execute(
                "INSERT INTO fake_role_members (role_id, member_id, added_at) VALUES (?, ?, ?)",
                params![id, member, now],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn change_group_name(&self, id: &str, name: &str) -> Result<(), StorageError> {
        let rows = self.conn()?.execute(
            "UPDATE fake_roles SET name = ?, updated_at = ? WHERE id = ?",
            params![name, now_millis(), id],
        )?;

        if rows == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn add_member(&self, id: &str, member: &str) -> Result<(), StorageError> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM fake_roles WHERE id = ?)",
            params![id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::NotFound(id.to_string()));
        }

        conn.execute(
            "INSERT OR IGNORE INTO fake_role_members (role_id, member_id, added_at)
             VALUES (?, ?, ?)",
            params![id, member, now_millis()],
        )?;
        Ok(())
    }

    fn remove_member(&self, id: &str, member: &str) -> Result<(), StorageError> {
        let rows = self.conn()?.execute(
            "DELETE FROM fake_role_members WHERE role_id = ? AND member_id = ?",
            params![id, member],
        )?;

        if rows == 0 {
            return Err(StorageError::NotFound(format!("{}/{}", id, member)));
        }
        Ok(())
    }

    fn delete_group(&self, id: &str) -> Result<(), StorageError> {
        let rows = self
            .conn()?
            .execute("DELETE FROM fake_roles WHERE id = ?", params![id])?;

        if rows == 0 {
            return Err(StorageError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn list_groups(&self) -> Result<Vec<GroupRecord>, StorageError> {
        let conn = self.conn()?;

        let mut groups: BTreeMap<String, GroupRecord> = BTreeMap::new();

        let mut stmt = conn.prepare("SELECT id, name FROM fake_roles")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (id, name) = row?;
            groups.insert(
                id.clone(),
                GroupRecord {
                    id,
                    name,
                    members: BTreeSet::new(),
                },
            );
        }

        let mut stmt = conn.prepare("SELECT role_id, member_id FROM fake_role_members")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (role_id, member_id) = row?;
            if let Some(group) = groups.get_mut(&role_id) {
                group.members.insert(member_id);
            }
        }

        Ok(groups.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "123456789012345678";
    const BOB: &str = "223456789012345678";

    fn members(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_create_and_list_groups() {
        let store = SqliteBackend::memory().unwrap();

        store.create_group("r2", "second", &members(&[BOB])).unwrap();
        store.create_group("r1", "first", &members(&[ALICE, BOB])).unwrap();

        let groups = store.list_groups().unwrap();
        assert_eq!(
            groups,
            vec![
                GroupRecord::new("r1", "first", [ALICE, BOB]),
                GroupRecord::new("r2", "second", [BOB]),
            ]
        );
    }

    #[test]
    fn test_create_duplicate_fails() {
        let store = SqliteBackend::memory().unwrap();
        store.create_group("r1", "raid", &members(&[ALICE])).unwrap();

        let err = store.create_group("r1", "raid", &members(&[BOB])).unwrap_err();
        assert_eq!(err, StorageError::AlreadyExists("r1".to_string()));

        // The failed create must not leak members into the existing group
        assert_eq!(store.list_groups().unwrap()[0].members, members(&[ALICE]));
    }

    #[test]
    fn test_change_group_name() {
        let store = SqliteBackend::memory().unwrap();
        store.create_group("r1", "raid", &members(&[ALICE])).unwrap();

        store.change_group_name("r1", "dungeon").unwrap();
        assert_eq!(store.list_groups().unwrap()[0].name, "dungeon");

        assert!(matches!(
            store.change_group_name("missing", "x"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_add_and_remove_member() {
        let store = SqliteBackend::memory().unwrap();
        store.create_group("r1", "raid", &members(&[ALICE])).unwrap();

        store.add_member("r1", BOB).unwrap();
        store.add_member("r1", BOB).unwrap();
        assert_eq!(store.list_groups().unwrap()[0].members, members(&[ALICE, BOB]));

        store.remove_member("r1", ALICE).unwrap();
        assert!(matches!(
            store.remove_member("r1", ALICE),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.add_member("missing", ALICE),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_cascades_members() {
        let store = SqliteBackend::memory().unwrap();
        store.create_group("r1", "raid", &members(&[ALICE, BOB])).unwrap();

        store.delete_group("r1").unwrap();
        assert!(store.list_groups().unwrap().is_empty());

        let conn = store.conn().unwrap();
        let count: i32 = conn
            .query_row("SELECT COUNT(*) FROM fake_role_members", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);

        drop(conn);
        assert!(matches!(store.delete_group("r1"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_reopen_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roles.db");

        {
            let store = SqliteBackend::open_path(&path).unwrap();
            store.create_group("r1", "raid", &members(&[ALICE])).unwrap();
        }

        let store = SqliteBackend::open_path(&path).unwrap();
        assert_eq!(
            store.list_groups().unwrap(),
            vec![GroupRecord::new("r1", "raid", [ALICE])]
        );
    }
}
