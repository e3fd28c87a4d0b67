//! Test fixtures for creating common test objects

use crate::group::{Group, GroupError};
use crate::storage::{GroupRecord, MemoryBackend, StorageBackend};
use std::sync::Arc;

const SNOWFLAKE_BASE: u64 = 100_000_000_000_000_000;

/// A valid 18 digit snowflake, distinct for each `n`
pub fn snowflake(n: u64) -> String {
    (SNOWFLAKE_BASE + n).to_string()
}

/// `count` distinct snowflakes: `snowflake(0)..snowflake(count - 1)`
pub fn snowflakes(count: usize) -> Vec<String> {
    (0..count as u64).map(snowflake).collect()
}

/// A fresh in-memory backend behind the trait object groups expect
pub fn memory_backend() -> Arc<dyn StorageBackend> {
    Arc::new(MemoryBackend::new())
}

/// Builder for creating test groups
pub struct TestGroupBuilder {
    id: String,
    name: String,
    members: Vec<String>,
}

impl TestGroupBuilder {
    pub fn new() -> Self {
        Self {
            id: "test-role".to_string(),
            name: "Test Role".to_string(),
            members: snowflakes(1),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_member_count(mut self, count: usize) -> Self {
        self.members = snowflakes(count);
        self
    }

    pub fn with_members(mut self, members: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.members = members.into_iter().map(Into::into).collect();
        self
    }

    pub fn record(&self) -> GroupRecord {
        GroupRecord::new(self.id.clone(), self.name.clone(), self.members.clone())
    }

    /// Create the group, persisting it to `backend`
    pub fn create(self, backend: Arc<dyn StorageBackend>) -> Result<Group, GroupError> {
        Group::create(backend, self.id, self.name, self.members)
    }
}

impl Default for TestGroupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
