//! Call-recording storage backend

use crate::storage::{GroupRecord, StorageBackend, StorageError};
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// One call made against a [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateGroup {
        id: String,
        name: String,
        members: BTreeSet<String>,
    },
    ChangeGroupName {
        id: String,
        name: String,
    },
    AddMember {
        id: String,
        member: String,
    },
    RemoveMember {
        id: String,
        member: String,
    },
    DeleteGroup {
        id: String,
    },
    ListGroups,
}

/// Wraps a backend, logging every call and optionally failing some.
///
/// Calls are recorded whether or not they fail. A queued failure is returned
/// instead of forwarding the call to the inner backend.
#[derive(Debug, Default)]
pub struct RecordingBackend<B> {
    inner: B,
    calls: Mutex<Vec<BackendCall>>,
    failures: Mutex<VecDeque<StorageError>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<B: StorageBackend> RecordingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Calls recorded so far, oldest first
    pub fn calls(&self) -> Vec<BackendCall> {
        lock(&self.calls).clone()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }

    /// Make the next call fail with `error`
    pub fn fail_next(&self, error: StorageError) {
        lock(&self.failures).push_back(error);
    }

    fn record<T>(
        &self,
        call: BackendCall,
        forward: impl FnOnce(&B) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        lock(&self.calls).push(call);
        match lock(&self.failures).pop_front() {
            Some(error) => Err(error),
            None => forward(&self.inner),
        }
    }
}

impl<B: StorageBackend> StorageBackend for RecordingBackend<B> {
    fn create_group(
        &self,
        id: &str,
        name: &str,
        members: &BTreeSet<String>,
    ) -> Result<(), StorageError> {
        let call = BackendCall::CreateGroup {
            id: id.to_string(),
            name: name.to_string(),
            members: members.clone(),
        };
        self.record(call, |b| b.create_group(id, name, members))
    }

    fn change_group_name(&self, id: &str, name: &str) -> Result<(), StorageError> {
        let call = BackendCall::ChangeGroupName {
            id: id.to_string(),
            name: name.to_string(),
        };
        self.record(call, |b| b.change_group_name(id, name))
    }

    fn add_member(&self, id: &str, member: &str) -> Result<(), StorageError> {
        let call = BackendCall::AddMember {
            id: id.to_string(),
            member: member.to_string(),
        };
        self.record(call, |b| b.add_member(id, member))
    }

    fn remove_member(&self, id: &str, member: &str) -> Result<(), StorageError> {
        let call = BackendCall::RemoveMember {
            id: id.to_string(),
            member: member.to_string(),
        };
        self.record(call, |b| b.remove_member(id, member))
    }

    fn delete_group(&self, id: &str) -> Result<(), StorageError> {
        let call = BackendCall::DeleteGroup { id: id.to_string() };
        self.record(call, |b| b.delete_group(id))
    }

    fn list_groups(&self) -> Result<Vec<GroupRecord>, StorageError> {
        self.record(BackendCall::ListGroups, |b| b.list_groups())
    }
}
