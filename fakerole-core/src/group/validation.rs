//! Stateless validators for group fields
//!
//! Limits come from the chat platform's 2000 character message budget:
//! masking 40 mentions costs about 1000 characters, each mention is at most
//! 21 characters, which leaves room for a 30 character name and some emoji.

use super::error::{GroupError, MemberSetViolation};
use std::collections::BTreeSet;

/// Longest allowed group name, in characters
pub const NAME_MAX_LENGTH: usize = 30;

/// Largest allowed member set
pub const MEMBERS_MAX_SIZE: usize = 40;

const SNOWFLAKE_MIN_DIGITS: usize = 17;
const SNOWFLAKE_MAX_DIGITS: usize = 20;

/// Whether `member` is a platform snowflake: 17 to 20 ASCII digits
pub fn is_valid_member(member: &str) -> bool {
    (SNOWFLAKE_MIN_DIGITS..=SNOWFLAKE_MAX_DIGITS).contains(&member.len())
        && member.bytes().all(|b| b.is_ascii_digit())
}

pub fn validate_id(id: &str) -> Result<(), GroupError> {
    if id.is_empty() {
        return Err(GroupError::InvalidId);
    }
    Ok(())
}

pub fn validate_name(id: &str, name: &str) -> Result<(), GroupError> {
    let len = name.chars().count();
    if len == 0 || len > NAME_MAX_LENGTH {
        return Err(GroupError::InvalidName {
            id: id.to_string(),
            len,
        });
    }
    Ok(())
}

pub fn validate_members(id: &str, members: &BTreeSet<String>) -> Result<(), GroupError> {
    let violation = if members.is_empty() {
        Some(MemberSetViolation::Empty)
    } else if members.len() > MEMBERS_MAX_SIZE {
        Some(MemberSetViolation::TooLarge(members.len()))
    } else {
        members
            .iter()
            .find(|m| !is_valid_member(m))
            .map(|m| MemberSetViolation::InvalidMember(m.clone()))
    };

    match violation {
        Some(violation) => Err(GroupError::InvalidMemberSet {
            id: id.to_string(),
            violation,
        }),
        None => Ok(()),
    }
}
