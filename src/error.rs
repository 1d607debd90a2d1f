//! Error handling for the club member registry
//!
//! Typed errors built with thiserror. Validation and duplicate-credential failures are
//! recoverable: the member stays open as a draft and the user corrects the input.
//! Persistence failures are reported but never fatal.

use std::fmt;
use std::path::PathBuf;

use club_types::{FieldName, MemberHandle, MemberKind};
use thiserror::Error;

/// First field of a draft that does not match its pattern
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{field} does not match the required format")]
pub struct ValidationError {
    pub field: FieldName,
}

/// A credential of a draft that another member already claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateCredential {
    pub field: FieldName,
    pub key: String,
}

impl fmt::Display for DuplicateCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "clubber with same {} {} already exists, type a different one",
            self.field.label(),
            self.key
        )
    }
}

/// Why a draft could not be committed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("validation failed: {0}")]
    Invalid(#[from] ValidationError),

    #[error("{}", join_duplicates(.0))]
    Duplicate(Vec<DuplicateCredential>),

    #[error("member {0} is not registered")]
    UnknownMember(MemberHandle),
}

fn join_duplicates(duplicates: &[DuplicateCredential]) -> String {
    duplicates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a rollback was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RollbackError {
    #[error("member was never committed; complete the form before cancelling")]
    NeverCommitted,

    #[error("member {0} is not registered")]
    UnknownMember(MemberHandle),
}

/// Why a draft edit was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("{field} is not a field of a {kind} member")]
    FieldNotInVariant { field: FieldName, kind: MemberKind },

    #[error("member {0} is not registered")]
    UnknownMember(MemberHandle),
}

/// Reading or writing the member file failed
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("member file {} cannot be read: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("member file {} is corrupt or its format was changed: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("member file {} has format version {found}, expected {expected}", .path.display())]
    IncompatibleVersion {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("members cannot be encoded for {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("member file {} cannot be written: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
