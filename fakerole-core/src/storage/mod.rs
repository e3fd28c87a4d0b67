//! Persistence boundary for fake roles
//!
//! [`StorageBackend`] is the only way a [`Group`](crate::group::Group) reaches
//! outside the process. Backends never see the entity itself, only ids,
//! names and member ids, so any durable store can sit behind the trait.

pub mod memory;
pub mod migrations;
pub mod sql_store;

use crate::config::{BackendKind, StorageConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

pub use memory::MemoryBackend;
pub use migrations::{migrate, CURRENT_SCHEMA_VERSION};
pub use sql_store::SqliteBackend;

/// Errors reported by storage backends
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("group not found: {0}")]
    NotFound(String),

    #[error("group already exists: {0}")]
    AlreadyExists(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        StorageError::Backend(e.to_string())
    }
}

impl From<r2d2::Error> for StorageError {
    fn from(e: r2d2::Error) -> Self {
        StorageError::Backend(format!("connection pool: {}", e))
    }
}

/// A group as the backend stores it: `(id, name, members)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub name: String,
    pub members: BTreeSet<String>,
}

impl GroupRecord {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

/// Capability interface a group synchronizes to.
///
/// Every method is a single side effect addressed by group id. Failures are
/// returned, never raised; `NotFound` is the "no such group" outcome.
pub trait StorageBackend: Send + Sync {
    /// Create a group with its initial members
    fn create_group(
        &self,
        id: &str,
        name: &str,
        members: &BTreeSet<String>,
    ) -> Result<(), StorageError>;

    /// Change the display name of a group
    fn change_group_name(&self, id: &str, name: &str) -> Result<(), StorageError>;

    /// Add one member to a group
    fn add_member(&self, id: &str, member: &str) -> Result<(), StorageError>;

    /// Remove one member from a group
    fn remove_member(&self, id: &str, member: &str) -> Result<(), StorageError>;

    /// Delete a group and all of its members
    fn delete_group(&self, id: &str) -> Result<(), StorageError>;

    /// Enumerate every stored group
    fn list_groups(&self) -> Result<Vec<GroupRecord>, StorageError>;
}

/// Build the backend selected by the storage configuration
pub fn open(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    match config.backend {
        BackendKind::Memory => Ok(Arc::new(MemoryBackend::new())),
        BackendKind::Sqlite => Ok(Arc::new(SqliteBackend::open(config)?)),
    }
}
