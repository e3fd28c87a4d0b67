//! Group error types

use thiserror::Error;

use super::validation::{MEMBERS_MAX_SIZE, NAME_MAX_LENGTH};

/// Errors raised by group construction and mutation.
///
/// Expected per-call rejections (bad snowflake, full group, absent member)
/// are not errors; `add` and `remove` report them as `Ok(false)`.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("group id cannot be empty")]
    InvalidId,

    #[error("name for group {id} must be 1 to {} characters, got {len}", NAME_MAX_LENGTH)]
    InvalidName { id: String, len: usize },

    #[error("member set for group {id} is invalid: {violation}")]
    InvalidMemberSet {
        id: String,
        violation: MemberSetViolation,
    },

    #[error("group {0} has been deleted")]
    Deleted(String),
}

/// Why a member set was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberSetViolation {
    #[error("a group needs at least one member")]
    Empty,

    #[error("{0} members exceeds the limit of {}", MEMBERS_MAX_SIZE)]
    TooLarge(usize),

    #[error("{0:?} is not a valid member id")]
    InvalidMember(String),

    /// The in-memory set grew past the limit; no public path should reach this
    #[error("group is over capacity with {0} members")]
    OverCapacity(usize),
}
