//! Member file persistence
//!
//! The whole member list is written as one bincode blob on save and read back whole on
//! load. A missing file is a first run, not an error.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::PersistenceError;
use crate::member::Member;

/// Version written into every snapshot
pub const FORMAT_VERSION: u32 = 1;

/// Where the member list lives between runs
pub trait MemberStore {
    /// Read the member list, `None` when nothing was ever saved
    fn read(&self) -> Result<Option<Vec<Member>>, PersistenceError>;

    /// Replace the stored list with `members`
    fn write(&self, members: &[Member]) -> Result<(), PersistenceError>;

    /// Short description for logs and messages
    fn describe(&self) -> String;
}

/// On-disk layout of the member file
#[derive(Debug, Serialize, Deserialize)]
struct RegistrySnapshot {
    format_version: u32,
    saved_at: DateTime<Utc>,
    members: Vec<Member>,
}

/// Serialization borrows the members instead of cloning them
#[derive(Serialize)]
struct RegistrySnapshotRef<'a> {
    format_version: u32,
    saved_at: DateTime<Utc>,
    members: &'a [Member],
}

/// Member list stored in a single bincode file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MemberStore for FileStore {
    fn read(&self) -> Result<Option<Vec<Member>>, PersistenceError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "member file absent");
                return Ok(None);
            }
            Err(source) => {
                warn!(path = %self.path.display(), error = %source, "member file unreadable");
                return Err(PersistenceError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let snapshot: RegistrySnapshot =
            bincode::deserialize(&bytes).map_err(|source| PersistenceError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        if snapshot.format_version != FORMAT_VERSION {
            return Err(PersistenceError::IncompatibleVersion {
                path: self.path.clone(),
                found: snapshot.format_version,
                expected: FORMAT_VERSION,
            });
        }

        debug!(
            path = %self.path.display(),
            members = snapshot.members.len(),
            saved_at = %snapshot.saved_at,
            "member file read"
        );
        Ok(Some(snapshot.members))
    }

    fn write(&self, members: &[Member]) -> Result<(), PersistenceError> {
        let snapshot = RegistrySnapshotRef {
            format_version: FORMAT_VERSION,
            saved_at: Utc::now(),
            members,
        };
        let bytes = bincode::serialize(&snapshot).map_err(|source| PersistenceError::Encode {
            path: self.path.clone(),
            source,
        })?;

        let write_error = |source| PersistenceError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_error)?;
        }
        std::fs::write(&self.path, bytes).map_err(write_error)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

impl fmt::Display for FileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
