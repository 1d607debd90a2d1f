//! Club Registry - member records with validated commits
//!
//! This crate keeps the member list of a club: people, soldiers and students. Each member
//! is edited through a draft that only becomes its committed record once every field
//! passes its pattern and none of its credentials is already claimed by someone else.
//!
//! ## Call Chain
//! Front end -> [`Registry`] -> [`Member`] -> [`rules`] -> [`resolver`] -> commit/rollback
//! -> [`MemberStore`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use club_registry::{FileStore, Registry};
//! use club_types::{FieldName, MemberKind};
//!
//! let store = FileStore::new("BKCustomers.dat");
//! let mut registry = Registry::load(&store).unwrap_or_default();
//!
//! let handle = registry.add_member(MemberKind::Person);
//! registry.stage(handle, FieldName::Id, "1-2345678|2").unwrap();
//! registry.stage(handle, FieldName::Name, "John").unwrap();
//! registry.stage(handle, FieldName::Surname, "Doe").unwrap();
//! registry.stage(handle, FieldName::Tel, "+(1)23-4567890").unwrap();
//! registry.commit(handle).unwrap();
//!
//! registry.save(&store).unwrap();
//! ```

// Core error handling
pub mod error;

pub mod config;

// Validation rules, members and the duplicate credential scan
pub mod member;
pub mod resolver;
pub mod rules;

pub mod persistence;
pub mod registry;

// Terminal front end (command language + session)
pub mod console;

pub use config::ClubConfig;
pub use error::{
    CommitError, DuplicateCredential, PersistenceError, RollbackError, StageError,
    ValidationError,
};
pub use member::{EditState, Member};
pub use persistence::{FileStore, MemberStore};
pub use registry::{MemberSummary, Registry, SearchOutcome};
pub use resolver::CredentialIndex;

pub use club_types::{FieldName, MemberHandle, MemberKind, MemberRecord};
