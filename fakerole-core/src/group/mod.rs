//! Fake roles: named, bounded groups of member snowflakes
//!
//! A [`Group`] validates every change against its invariants, applies it in
//! memory, then issues exactly one [`StorageBackend`] call for it.
//!
//! # Invariants
//!
//! - `id` is non-empty and never changes
//! - `name` is 1 to [`NAME_MAX_LENGTH`] characters
//! - `members` holds 1 to [`MEMBERS_MAX_SIZE`] valid snowflakes; a group that
//!   loses its last member is deleted from the backend in the same call
//!
//! # Persistence failures
//!
//! In-memory state is authoritative for the running process. When the backend
//! reports a failure the change is kept, the failure is logged at `warn`,
//! counted under [`metrics::BACKEND_FAILURES`](crate::metrics::BACKEND_FAILURES)
//! and reflected by [`Group::failed_syncs`].
//!
//! # Concurrency
//!
//! `Group` is not synchronized. Mutation takes `&mut self`, so one handle is
//! safe by construction, but two handles for the same id (for example from
//! two [`fetch_all`] calls) will race in the backend. Callers sharing groups
//! across threads must keep a single handle per id behind their own lock.

mod error;
mod validation;

pub use error::{GroupError, MemberSetViolation};
pub use validation::{
    is_valid_member, validate_id, validate_members, validate_name, MEMBERS_MAX_SIZE,
    NAME_MAX_LENGTH,
};

use crate::metrics::{
    self as fr_metrics, GROUPS_CREATED, GROUPS_DELETED, MEMBERS_ADDED, MEMBERS_REMOVED,
};
use crate::storage::{GroupRecord, StorageBackend, StorageError};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A validated fake role synchronized to a storage backend
pub struct Group {
    id: String,
    name: String,
    members: BTreeSet<String>,
    backend: Arc<dyn StorageBackend>,
    deleted: bool,
    failed_syncs: usize,
}

impl Group {
    /// Create a new group and persist it with `create_group`.
    ///
    /// The group is returned even if the backend rejects the create; see
    /// [`Group::failed_syncs`].
    pub fn create(
        backend: Arc<dyn StorageBackend>,
        id: impl Into<String>,
        name: impl Into<String>,
        members: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, GroupError> {
        let mut group = Self::build(backend, id.into(), name.into(), collect(members))?;

        info!(
            group_id = %group.id,
            name = %group.name,
            members = group.members.len(),
            "Creating group"
        );
        let result = group
            .backend
            .create_group(&group.id, &group.name, &group.members);
        if group.sync("create_group", result) {
            fr_metrics::record_counter(GROUPS_CREATED, 1);
        }

        Ok(group)
    }

    /// Rebuild a group that already exists in the backend. No backend call.
    pub fn from_record(
        backend: Arc<dyn StorageBackend>,
        record: GroupRecord,
    ) -> Result<Self, GroupError> {
        Self::build(backend, record.id, record.name, record.members)
    }

    fn build(
        backend: Arc<dyn StorageBackend>,
        id: String,
        name: String,
        members: BTreeSet<String>,
    ) -> Result<Self, GroupError> {
        validate_id(&id)?;
        validate_name(&id, &name)?;
        validate_members(&id, &members)?;

        Ok(Self {
            id,
            name,
            members,
            backend,
            deleted: false,
            failed_syncs: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only view of the members. Use [`add`](Self::add) and
    /// [`remove`](Self::remove) to change them.
    pub fn members(&self) -> &BTreeSet<String> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.contains(member)
    }

    /// Whether the group was deleted; a deleted handle rejects mutation
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Number of backend calls from this handle that reported failure
    pub fn failed_syncs(&self) -> usize {
        self.failed_syncs
    }

    /// Snapshot as a backend record
    pub fn to_record(&self) -> GroupRecord {
        GroupRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            members: self.members.clone(),
        }
    }

    /// Rename the group. Renaming to the current name does nothing.
    pub fn rename(&mut self, new_name: &str) -> Result<(), GroupError> {
        self.ensure_live()?;
        validate_name(&self.id, new_name)?;
        if new_name == self.name {
            return Ok(());
        }

        debug!(group_id = %self.id, from = %self.name, to = %new_name, "Renaming group");
        self.name = new_name.to_string();
        let result = self.backend.change_group_name(&self.id, &self.name);
        self.sync("change_group_name", result);
        Ok(())
    }

    /// Add a member.
    ///
    /// Returns `Ok(false)` without touching state or backend if `member` is
    /// not a snowflake or the group is full. Adding a present member still
    /// issues `add_member` and returns `Ok(true)`.
    pub fn add(&mut self, member: &str) -> Result<bool, GroupError> {
        self.ensure_live()?;
        if !is_valid_member(member) {
            debug!(group_id = %self.id, member, "Rejected add: not a snowflake");
            return Ok(false);
        }
        if self.members.len() > MEMBERS_MAX_SIZE {
            return Err(GroupError::InvalidMemberSet {
                id: self.id.clone(),
                violation: MemberSetViolation::OverCapacity(self.members.len()),
            });
        }
        if self.members.len() == MEMBERS_MAX_SIZE {
            debug!(group_id = %self.id, member, "Rejected add: group is full");
            return Ok(false);
        }

        self.members.insert(member.to_string());
        debug!(group_id = %self.id, member, "Added member");
        let result = self.backend.add_member(&self.id, member);
        if self.sync("add_member", result) {
            fr_metrics::record_counter(MEMBERS_ADDED, 1);
        }
        Ok(true)
    }

    /// Remove a member, deleting the group if it was the last one.
    ///
    /// Returns `Ok(false)` without touching state or backend if `member` is
    /// not a snowflake or is not in the group.
    pub fn remove(&mut self, member: &str) -> Result<bool, GroupError> {
        self.ensure_live()?;
        if !is_valid_member(member) {
            debug!(group_id = %self.id, member, "Rejected remove: not a snowflake");
            return Ok(false);
        }
        if !self.members.remove(member) {
            debug!(group_id = %self.id, member, "Rejected remove: not a member");
            return Ok(false);
        }

        debug!(group_id = %self.id, member, "Removed member");
        let result = self.backend.remove_member(&self.id, member);
        if self.sync("remove_member", result) {
            fr_metrics::record_counter(MEMBERS_REMOVED, 1);
        }

        if self.members.is_empty() {
            self.delete();
        }
        Ok(true)
    }

    /// Delete the group from the backend and return whether the backend
    /// accepted it. The handle is marked deleted either way; deleting twice
    /// returns `false` without a second backend call.
    pub fn delete(&mut self) -> bool {
        if self.deleted {
            debug!(group_id = %self.id, "Group already deleted");
            return false;
        }

        info!(group_id = %self.id, "Deleting group");
        self.deleted = true;
        let result = self.backend.delete_group(&self.id);
        let ok = self.sync("delete_group", result);
        if ok {
            fr_metrics::record_counter(GROUPS_DELETED, 1);
        }
        ok
    }

    fn ensure_live(&self) -> Result<(), GroupError> {
        if self.deleted {
            return Err(GroupError::Deleted(self.id.clone()));
        }
        Ok(())
    }

    fn sync(&mut self, operation: &'static str, result: Result<(), StorageError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(group_id = %self.id, operation, error = %e, "Backend call failed");
                fr_metrics::record_backend_failure(operation);
                self.failed_syncs += 1;
                false
            }
        }
    }
}

fn collect(members: impl IntoIterator<Item = impl Into<String>>) -> BTreeSet<String> {
    members.into_iter().map(Into::into).collect()
}

impl fmt::Debug for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("members", &self.members)
            .field("deleted", &self.deleted)
            .field("failed_syncs", &self.failed_syncs)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{:?}", self.id, self.name, self.members)
    }
}

/// Load every stored group.
///
/// Each record goes through the same validation as construction, without a
/// `create_group` call. A record that breaks an invariant shows up as its own
/// `Err` entry; the outer error means the enumeration itself failed.
pub fn fetch_all(
    backend: &Arc<dyn StorageBackend>,
) -> Result<Vec<Result<Group, GroupError>>, StorageError> {
    let records = backend.list_groups()?;
    debug!(count = records.len(), "Fetched group records");

    Ok(records
        .into_iter()
        .map(|record| {
            let id = record.id.clone();
            Group::from_record(Arc::clone(backend), record).inspect_err(|e| {
                warn!(group_id = %id, error = %e, "Stored group failed validation");
            })
        })
        .collect())
}
