//! Club member: committed record, editable draft, and the commit/rollback controller
//!
//! Every member keeps two copies of its fields. The draft is what the user is editing;
//! the committed copy is the last version that passed validation and the duplicate
//! credential check. The two are only synchronised by [`Member::commit`] and
//! [`Member::rollback`].
//!
//! ```text
//!            stage()                      commit() ok
//!   ┌──────► Draft ──────────────────────────────► Committed
//!   │          ▲  │ commit() rejected                 │
//!   │          │  └──► Draft (one error mark)         │ stage()
//!   │          └──────────────────────────────────────┘
//!   │ rollback(): draft := committed  (refused until the first commit)
//! ```

use club_types::{FieldName, MemberHandle, MemberKind, MemberRecord, VariantFields};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{CommitError, RollbackError, StageError, ValidationError};
use crate::resolver::{self, CredentialIndex};
use crate::rules;

/// Characters of a student id that precede its numeric credential (`ABC/`)
pub const STUDENT_ID_PREFIX_LEN: usize = 4;

/// Where a member is in its edit cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditState {
    /// Draft differs from (or was never accepted into) the committed copy
    Draft,
    /// Draft and committed copy agree
    Committed,
}

/// One registered club member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    handle: MemberHandle,
    draft: MemberRecord,
    committed: MemberRecord,
    state: EditState,
    /// Cancelling edits becomes possible after the first successful commit, and stays so
    cancel_enabled: bool,

    // Form state, not persisted
    #[serde(skip)]
    error_mark: Option<FieldName>,
    #[serde(skip)]
    open: bool,
}

impl Member {
    /// Blank draft of the given kind, opened for editing
    pub fn new(kind: MemberKind) -> Self {
        Self {
            handle: MemberHandle::new(),
            draft: MemberRecord::blank(kind),
            committed: MemberRecord::blank(kind),
            state: EditState::Draft,
            cancel_enabled: false,
            error_mark: None,
            open: true,
        }
    }

    pub fn handle(&self) -> MemberHandle {
        self.handle
    }

    pub fn kind(&self) -> MemberKind {
        self.committed.kind()
    }

    pub fn draft(&self) -> &MemberRecord {
        &self.draft
    }

    pub fn committed(&self) -> &MemberRecord {
        &self.committed
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    pub fn can_cancel(&self) -> bool {
        self.cancel_enabled
    }

    /// Field currently flagged as erroneous on the form
    pub fn error_mark(&self) -> Option<FieldName> {
        self.error_mark
    }

    /// Whether the member's form is showing
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Bring the member's form up (search hit, explicit open)
    pub fn show(&mut self) {
        self.open = true;
    }

    /// True until the first successful commit
    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// Whether `key` equals one of this member's committed credentials.
    ///
    /// Person: id. Soldier: id or personal number. Student: id or the student id
    /// from index 4 onward (`ABC/12345` is matched by `12345`).
    pub fn matches(&self, key: &str) -> bool {
        let record = &self.committed;
        if record.base.id.as_deref() == Some(key) {
            return true;
        }
        match &record.variant {
            VariantFields::Person => false,
            VariantFields::Soldier { personal_num } => personal_num.as_deref() == Some(key),
            VariantFields::Student { student_id } => {
                student_id.as_deref().and_then(student_credential) == Some(key)
            }
        }
    }

    /// Credentials the draft would claim if committed, in declaration order
    pub fn draft_credentials(&self) -> Vec<(FieldName, String)> {
        let record = &self.draft;
        let mut credentials = Vec::with_capacity(2);
        if let Some(id) = &record.base.id {
            credentials.push((FieldName::Id, id.clone()));
        }
        match &record.variant {
            VariantFields::Person => {}
            VariantFields::Soldier { personal_num } => {
                if let Some(num) = personal_num {
                    credentials.push((FieldName::PersonalNum, num.clone()));
                }
            }
            VariantFields::Student { student_id } => {
                if let Some(suffix) = student_id.as_deref().and_then(student_credential) {
                    credentials.push((FieldName::StudentId, suffix.to_string()));
                }
            }
        }
        credentials
    }

    // =========================================================================
    // Draft editing
    // =========================================================================

    /// Write a value into the draft. The committed copy is untouched.
    pub fn stage(&mut self, field: FieldName, value: impl Into<String>) -> Result<(), StageError> {
        let kind = self.kind();
        let slot = self
            .draft
            .slot_mut(field)
            .ok_or(StageError::FieldNotInVariant { field, kind })?;
        *slot = Some(value.into());
        self.state = EditState::Draft;
        debug!(member = %self.handle, field = field.as_str(), "staged draft field");
        Ok(())
    }

    /// Run the kind's rules over the draft. Clears the previous mark and sets a new one
    /// on the first failing field.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        self.error_mark = None;
        rules::validate(&self.draft).inspect_err(|err| {
            self.error_mark = Some(err.field);
        })
    }

    // =========================================================================
    // Commit / rollback
    // =========================================================================

    /// Accept the draft.
    ///
    /// Requires the draft to validate and none of its credentials to be claimed by
    /// another member of `index`. Every credential is checked even when the first one
    /// already collides. On success the draft is copied into the committed record,
    /// cancelling is enabled and the form closes. On failure nothing but the error
    /// mark changes.
    pub fn commit<I>(&mut self, index: &I) -> Result<(), CommitError>
    where
        I: CredentialIndex + ?Sized,
    {
        if let Err(err) = self.validate() {
            warn!(member = %self.handle, field = err.field.as_str(), "commit rejected: invalid field");
            return Err(err.into());
        }

        let duplicates =
            resolver::duplicate_credentials(index, &self.draft_credentials(), self.handle);
        if let Some(first) = duplicates.first() {
            warn!(
                member = %self.handle,
                collisions = duplicates.len(),
                "commit rejected: duplicate credential"
            );
            self.error_mark = Some(first.field);
            return Err(CommitError::Duplicate(duplicates));
        }

        self.committed = self.draft.clone();
        self.error_mark = None;
        self.cancel_enabled = true;
        self.state = EditState::Committed;
        self.open = false;
        info!(member = %self.handle, kind = %self.kind(), "member committed");
        Ok(())
    }

    /// Discard draft edits: copy every committed field back over the draft and close the
    /// form. Refused for a member that was never committed.
    pub fn rollback(&mut self) -> Result<(), RollbackError> {
        if !self.cancel_enabled {
            warn!(member = %self.handle, "rollback refused: never committed");
            return Err(RollbackError::NeverCommitted);
        }
        self.draft = self.committed.clone();
        self.error_mark = None;
        self.state = EditState::Committed;
        self.open = false;
        debug!(member = %self.handle, "draft rolled back");
        Ok(())
    }
}

/// Numeric part of a student id, `None` if the id is too short to have one
pub fn student_credential(student_id: &str) -> Option<&str> {
    student_id.get(STUDENT_ID_PREFIX_LEN..)
}
