//! Metrics for group synchronization
//!
//! Only records through the `metrics` facade. Installing a recorder or an
//! exporter is left to the hosting process.

use metrics::{counter, describe_counter};

pub const GROUPS_CREATED: &str = "fakerole.groups.created";
pub const GROUPS_DELETED: &str = "fakerole.groups.deleted";
pub const MEMBERS_ADDED: &str = "fakerole.members.added";
pub const MEMBERS_REMOVED: &str = "fakerole.members.removed";
pub const BACKEND_FAILURES: &str = "fakerole.backend.failures";

/// Register metric descriptions with the installed recorder
pub fn init_metrics() {
    describe_counter!(GROUPS_CREATED, "Groups created through Group::create");
    describe_counter!(GROUPS_DELETED, "Groups deleted, explicitly or by removing the last member");
    describe_counter!(MEMBERS_ADDED, "Accepted member additions");
    describe_counter!(MEMBERS_REMOVED, "Accepted member removals");
    describe_counter!(BACKEND_FAILURES, "Backend calls that reported failure, by operation");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}

/// Record a failed backend call for `operation`
pub fn record_backend_failure(operation: &'static str) {
    counter!(BACKEND_FAILURES, "operation" => operation).increment(1);
}
