//! Duplicate credential resolution
//!
//! Linear scan over the registered members in insertion order. The member asking is
//! excluded by handle, so a draft is never reported as colliding with its own committed
//! values.

use club_types::{FieldName, MemberHandle};
use tracing::debug;

use crate::error::DuplicateCredential;
use crate::member::Member;

/// Anything that can answer "does another member already claim this key?"
pub trait CredentialIndex {
    fn is_duplicate(&self, key: &str, requester: MemberHandle) -> bool;
}

impl CredentialIndex for [Member] {
    fn is_duplicate(&self, key: &str, requester: MemberHandle) -> bool {
        is_duplicate(self, key, requester)
    }
}

impl CredentialIndex for Vec<Member> {
    fn is_duplicate(&self, key: &str, requester: MemberHandle) -> bool {
        is_duplicate(self, key, requester)
    }
}

/// First member other than `requester` whose committed credentials match `key`
pub fn find_claimant<'a, I>(members: I, key: &str, requester: MemberHandle) -> Option<&'a Member>
where
    I: IntoIterator<Item = &'a Member>,
{
    members
        .into_iter()
        .find(|member| member.handle() != requester && member.matches(key))
}

/// Whether a member other than `requester` already claims `key`
pub fn is_duplicate<'a, I>(members: I, key: &str, requester: MemberHandle) -> bool
where
    I: IntoIterator<Item = &'a Member>,
{
    let claimant = find_claimant(members, key, requester);
    if let Some(member) = claimant {
        debug!(key, claimant = %member.handle(), requester = %requester, "credential already claimed");
    }
    claimant.is_some()
}

/// Check every credential against the index and collect the collisions.
///
/// All credentials are checked; the result is in the order they were given.
pub fn duplicate_credentials<I>(
    index: &I,
    credentials: &[(FieldName, String)],
    requester: MemberHandle,
) -> Vec<DuplicateCredential>
where
    I: CredentialIndex + ?Sized,
{
    credentials
        .iter()
        .filter(|(_, key)| index.is_duplicate(key, requester))
        .map(|(field, key)| DuplicateCredential {
            field: *field,
            key: key.clone(),
        })
        .collect()
}
