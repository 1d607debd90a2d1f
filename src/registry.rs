//! Member registry
//!
//! Owns the ordered list of members (insertion order = creation order) and routes every
//! operation to the right member. Credential uniqueness is enforced by the commit path,
//! not by the collection itself.

use club_types::{FieldName, MemberHandle, MemberKind};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CommitError, PersistenceError, RollbackError, StageError};
use crate::member::{EditState, Member};
use crate::persistence::MemberStore;
use crate::resolver::{self, CredentialIndex};

/// Result of a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The first member whose credentials match; its form is now open
    Found(MemberHandle),
    NotFound,
}

/// One line of a member listing
#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub position: usize,
    pub handle: String,
    pub kind: MemberKind,
    pub id: Option<String>,
    pub name: String,
    pub state: EditState,
    pub open: bool,
}

/// All members known to the club
#[derive(Debug, Default)]
pub struct Registry {
    members: Vec<Member>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry over an already loaded member list, abandoned drafts removed
    pub fn from_members(members: Vec<Member>) -> Self {
        let mut registry = Self { members };
        registry.purge_empty();
        registry
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn get(&self, handle: MemberHandle) -> Option<&Member> {
        self.members.iter().find(|m| m.handle() == handle)
    }

    pub fn get_mut(&mut self, handle: MemberHandle) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.handle() == handle)
    }

    /// Member at a listing position
    pub fn at(&self, position: usize) -> Option<&Member> {
        self.members.get(position)
    }

    fn position(&self, handle: MemberHandle) -> Option<usize> {
        self.members.iter().position(|m| m.handle() == handle)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Register a blank draft of the given kind.
    ///
    /// The draft is visible to duplicate scans right away, even before its own commit.
    pub fn add_member(&mut self, kind: MemberKind) -> MemberHandle {
        let member = Member::new(kind);
        let handle = member.handle();
        self.members.push(member);
        info!(member = %handle, %kind, "member draft added");
        handle
    }

    /// Edit one draft field of a member
    pub fn stage(
        &mut self,
        handle: MemberHandle,
        field: FieldName,
        value: impl Into<String>,
    ) -> Result<(), StageError> {
        self.get_mut(handle)
            .ok_or(StageError::UnknownMember(handle))?
            .stage(field, value)
    }

    /// Try to accept a member's draft, checking its credentials against everyone else
    pub fn commit(&mut self, handle: MemberHandle) -> Result<(), CommitError> {
        let index = self
            .position(handle)
            .ok_or(CommitError::UnknownMember(handle))?;
        let (before, rest) = self.members.split_at_mut(index);
        let (member, after) = rest
            .split_first_mut()
            .ok_or(CommitError::UnknownMember(handle))?;
        let others = OtherMembers { before, after };
        member.commit(&others)
    }

    /// Discard a member's draft edits
    pub fn rollback(&mut self, handle: MemberHandle) -> Result<(), RollbackError> {
        self.get_mut(handle)
            .ok_or(RollbackError::UnknownMember(handle))?
            .rollback()
    }

    /// Whether a member other than `requester` already claims `key`
    pub fn is_duplicate(&self, key: &str, requester: MemberHandle) -> bool {
        self.members.is_duplicate(key, requester)
    }

    /// First member matching `key`, without touching it
    pub fn find(&self, key: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.matches(key))
    }

    /// Look a member up by credential and open its form.
    ///
    /// One attempt only; retrying with another key is up to the caller.
    pub fn search(&mut self, key: &str) -> SearchOutcome {
        match self.members.iter_mut().find(|m| m.matches(key)) {
            Some(member) => {
                member.show();
                debug!(key, member = %member.handle(), "search hit");
                SearchOutcome::Found(member.handle())
            }
            None => {
                debug!(key, "search miss");
                SearchOutcome::NotFound
            }
        }
    }

    /// Remove every member that never got committed. Returns how many were removed.
    pub fn purge_empty(&mut self) -> usize {
        let before = self.members.len();
        self.members.retain(|m| !m.is_empty());
        let removed = before - self.members.len();
        if removed > 0 {
            info!(removed, "purged abandoned drafts");
        }
        removed
    }

    /// Members with their listing positions
    pub fn summaries(&self) -> Vec<MemberSummary> {
        self.members
            .iter()
            .enumerate()
            .map(|(position, m)| MemberSummary {
                position,
                handle: m.handle().to_string(),
                kind: m.kind(),
                id: m.committed().base.id.clone(),
                name: if m.is_empty() {
                    m.draft().display_name()
                } else {
                    m.committed().display_name()
                },
                state: m.state(),
                open: m.is_open(),
            })
            .collect()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Load the registry from a store. A store with nothing in it gives an empty registry.
    pub fn load(store: &dyn MemberStore) -> Result<Self, PersistenceError> {
        let registry = match store.read()? {
            Some(members) => Self::from_members(members),
            None => {
                info!(store = %store.describe(), "no member file yet, starting empty");
                Self::new()
            }
        };
        info!(members = registry.len(), "registry loaded");
        Ok(registry)
    }

    /// Write every member, open drafts included, to the store
    pub fn save(&self, store: &dyn MemberStore) -> Result<(), PersistenceError> {
        store.write(&self.members)?;
        info!(members = self.members.len(), store = %store.describe(), "registry saved");
        Ok(())
    }
}

/// Every member except the one being committed
struct OtherMembers<'a> {
    before: &'a [Member],
    after: &'a [Member],
}

impl CredentialIndex for OtherMembers<'_> {
    fn is_duplicate(&self, key: &str, requester: MemberHandle) -> bool {
        resolver::is_duplicate(self.before.iter().chain(self.after), key, requester)
    }
}
