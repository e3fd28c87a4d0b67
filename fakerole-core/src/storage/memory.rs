//! In-memory storage backend
//!
//! Groups live only as long as the backend value. Suitable for tests and for
//! embedding where durability is handled elsewhere.

use super::{GroupRecord, StorageBackend, StorageError};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Clone)]
struct StoredGroup {
    name: String,
    members: BTreeSet<String>,
}

/// Process-local backend keyed by group id
#[derive(Debug, Default)]
pub struct MemoryBackend {
    groups: RwLock<BTreeMap<String, StoredGroup>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored groups
    pub fn len(&self) -> usize {
        self.groups
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, StoredGroup>>, StorageError> {
        self.groups
            .read()
            .map_err(|_| StorageError::Backend("memory backend lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, StoredGroup>>, StorageError> {
        self.groups
            .write()
            .map_err(|_| StorageError::Backend("memory backend lock poisoned".to_string()))
    }
}

impl StorageBackend for MemoryBackend {
    fn create_group(
        &self,
        id: &str,
        name: &str,
        members: &BTreeSet<String>,
    ) -> Result<(), StorageError> {
        let mut groups = self.write()?;
        if groups.contains_key(id) {
            return Err(StorageError::AlreadyExists(id.to_string()));
        }

        groups.insert(
            id.to_string(),
            StoredGroup {
                name: name.to_string(),
                members: members.clone(),
            },
        );
        Ok(())
    }

    fn change_group_name(&self, id: &str, name: &str) -> Result<(), StorageError> {
        let mut groups = self.write()?;
        let group = groups
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        group.name = name.to_string();
        Ok(())
    }

    fn add_member(&self, id: &str, member: &str) -> Result<(), StorageError> {
        let mut groups = self.write()?;
        let group = groups
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        group.members.insert(member.to_string());
        Ok(())
    }

    fn remove_member(&self, id: &str, member: &str) -> Result<(), StorageError> {
        let mut groups = self.write()?;
        let group = groups
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        if !group.members.remove(member) {
            return Err(StorageError::NotFound(format!("{}/{}", id, member)));
        }
        Ok(())
    }

    fn delete_group(&self, id: &str) -> Result<(), StorageError> {
        self.write()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn list_groups(&self) -> Result<Vec<GroupRecord>, StorageError> {
        Ok(self
            .read()?
            .iter()
            .map(|(id, group)| GroupRecord {
                id: id.clone(),
                name: group.name.clone(),
                members: group.members.clone(),
            })
            .collect())
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
    fn test_create_and_list() {
        let backend = MemoryBackend::new();
        backend.create_group("r1", "raid", &members(&[ALICE])).unwrap();

        assert_eq!(backend.len(), 1);
        assert_eq!(
            backend.list_groups().unwrap(),
            vec![GroupRecord::new("r1", "raid", [ALICE])]
        );
    }

    #[test]
    fn test_len_survives_poisoned_lock() {
        let backend = std::sync::Arc::new(MemoryBackend::new());
        backend.create_group("r1", "raid", &members(&[ALICE])).unwrap();

        let poisoner = std::sync::Arc::clone(&backend);
        let result = std::thread::spawn(move || {
            let _guard = poisoner.groups.write().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(result.is_err());

        assert_eq!(backend.len(), 1);
        assert!(!backend.is_empty());
        assert!(matches!(backend.list_groups(), Err(StorageError::Backend(_))));
    }

    #[test]
    fn test_create_duplicate_fails() {
        let backend = MemoryBackend::new();
        backend.create_group("r1", "raid", &members(&[ALICE])).unwrap();

        let err = backend.create_group("r1", "other", &members(&[BOB])).unwrap_err();
        assert_eq!(err, StorageError::AlreadyExists("r1".to_string()));
    }

    #[test]
    fn test_missing_group_reports_not_found() {
        let backend = MemoryBackend::new();

        assert!(matches!(
            backend.change_group_name("nope", "x"),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(backend.add_member("nope", ALICE), Err(StorageError::NotFound(_))));
        assert!(matches!(
            backend.remove_member("nope", ALICE),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(backend.delete_group("nope"), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_member_updates() {
        let backend = MemoryBackend::new();
        backend.create_group("r1", "raid", &members(&[ALICE])).unwrap();

        backend.add_member("r1", BOB).unwrap();
        backend.add_member("r1", BOB).unwrap();
        backend.remove_member("r1", ALICE).unwrap();
        assert!(backend.remove_member("r1", ALICE).is_err());

        let groups = backend.list_groups().unwrap();
        assert_eq!(groups[0].members, members(&[BOB]));
    }

    #[test]
    fn test_rename_and_delete() {
        let backend = MemoryBackend::new();
        backend.create_group("r1", "raid", &members(&[ALICE])).unwrap();

        backend.change_group_name("r1", "dungeon").unwrap();
        assert_eq!(backend.list_groups().unwrap()[0].name, "dungeon");

        backend.delete_group("r1").unwrap();
        assert!(backend.is_empty());
    }
}
