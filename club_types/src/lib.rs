//! Club Types - Level 1 Foundation Types
//!
//! This crate contains the pure data structures shared by the member registry and the
//! front ends built on top of it.
//!
//! ## Architecture Level: LEVEL 1 (Foundation)
//!
//! All other crates depend on this one; this crate depends on nothing else in the
//! repository.
//!
//! ## Contents
//!
//! - Member kinds (Person, Soldier, Student)
//! - Field names and their display labels
//! - Member handles (identity of one member instance)
//! - Member records: a common base record plus a tagged variant part
//!
//! ## Rules
//!
//! 1. **NO BUSINESS LOGIC** - validation and matching live in the registry crate
//! 2. **SERIALIZABLE** - every type supports serde
//! 3. **UNSET IS `None`** - a field that was never filled in is `None`, not `""`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// MEMBER KINDS
// ============================================================================

/// The three kinds of club member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Person,
    Soldier,
    Student,
}

impl MemberKind {
    /// All kinds, in the order they are offered to the user
    pub const ALL: [MemberKind; 3] = [MemberKind::Person, MemberKind::Soldier, MemberKind::Student];

    /// Lowercase identifier used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Person => "person",
            MemberKind::Soldier => "soldier",
            MemberKind::Student => "student",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            MemberKind::Person => "Person",
            MemberKind::Soldier => "Soldier",
            MemberKind::Student => "Student",
        }
    }

    /// Fields declared for this kind, base fields first
    pub fn fields(&self) -> &'static [FieldName] {
        match self {
            MemberKind::Person => &FieldName::BASE,
            MemberKind::Soldier => &[
                FieldName::Id,
                FieldName::Name,
                FieldName::Surname,
                FieldName::Tel,
                FieldName::PersonalNum,
            ],
            MemberKind::Student => &[
                FieldName::Id,
                FieldName::Name,
                FieldName::Surname,
                FieldName::Tel,
                FieldName::StudentId,
            ],
        }
    }

    /// The field this kind adds on top of the base record
    pub fn extra_field(&self) -> Option<FieldName> {
        match self {
            MemberKind::Person => None,
            MemberKind::Soldier => Some(FieldName::PersonalNum),
            MemberKind::Student => Some(FieldName::StudentId),
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a member kind or field name cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseNameError {
    #[error("unknown member kind '{0}' (expected person, soldier or student)")]
    UnknownKind(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),
}

impl FromStr for MemberKind {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "person" => Ok(MemberKind::Person),
            "soldier" => Ok(MemberKind::Soldier),
            "student" => Ok(MemberKind::Student),
            _ => Err(ParseNameError::UnknownKind(s.to_string())),
        }
    }
}

// ============================================================================
// FIELD NAMES
// ============================================================================

/// Every editable field across all member kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldName {
    Id,
    Name,
    Surname,
    Tel,
    PersonalNum,
    StudentId,
}

impl FieldName {
    /// Fields shared by every kind, in declaration order
    pub const BASE: [FieldName; 4] = [
        FieldName::Id,
        FieldName::Name,
        FieldName::Surname,
        FieldName::Tel,
    ];

    /// Identifier used in commands (`set personal_num ...`)
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Id => "id",
            FieldName::Name => "name",
            FieldName::Surname => "surname",
            FieldName::Tel => "tel",
            FieldName::PersonalNum => "personal_num",
            FieldName::StudentId => "student_id",
        }
    }

    /// Label shown next to the field on a member form
    pub fn label(&self) -> &'static str {
        match self {
            FieldName::Id => "ID",
            FieldName::Name => "Name",
            FieldName::Surname => "Surname",
            FieldName::Tel => "Tel",
            FieldName::PersonalNum => "Personal NO.",
            FieldName::StudentId => "Student ID",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FieldName {
    type Err = ParseNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "id" => Ok(FieldName::Id),
            "name" => Ok(FieldName::Name),
            "surname" => Ok(FieldName::Surname),
            "tel" | "phone" => Ok(FieldName::Tel),
            "personal_num" | "personalnum" | "personal_no" => Ok(FieldName::PersonalNum),
            "student_id" | "studentid" => Ok(FieldName::StudentId),
            _ => Err(ParseNameError::UnknownField(s.to_string())),
        }
    }
}

// ============================================================================
// MEMBER HANDLE
// ============================================================================

/// Identity of one member instance.
///
/// Two members holding identical field values are still different members; duplicate
/// detection excludes the requesting member by handle, never by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberHandle(Uuid);

impl MemberHandle {
    /// Allocate a fresh handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MemberHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

// ============================================================================
// MEMBER RECORDS
// ============================================================================

/// Fields common to every member kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFields {
    pub id: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub tel: Option<String>,
}

/// The kind-specific part of a member record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariantFields {
    Person,
    Soldier { personal_num: Option<String> },
    Student { student_id: Option<String> },
}

/// One complete set of member fields: the base record plus its variant part.
///
/// A member keeps two of these, its draft and its committed copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub base: BaseFields,
    pub variant: VariantFields,
}

impl MemberRecord {
    /// Record of the given kind with every field unset
    pub fn blank(kind: MemberKind) -> Self {
        let variant = match kind {
            MemberKind::Person => VariantFields::Person,
            MemberKind::Soldier => VariantFields::Soldier { personal_num: None },
            MemberKind::Student => VariantFields::Student { student_id: None },
        };
        Self {
            base: BaseFields::default(),
            variant,
        }
    }

    /// Fully populated person record
    pub fn person(
        id: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        tel: impl Into<String>,
    ) -> Self {
        Self {
            base: BaseFields {
                id: Some(id.into()),
                name: Some(name.into()),
                surname: Some(surname.into()),
                tel: Some(tel.into()),
            },
            variant: VariantFields::Person,
        }
    }

    /// Fully populated soldier record
    pub fn soldier(
        id: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        tel: impl Into<String>,
        personal_num: impl Into<String>,
    ) -> Self {
        let mut record = Self::person(id, name, surname, tel);
        record.variant = VariantFields::Soldier {
            personal_num: Some(personal_num.into()),
        };
        record
    }

    /// Fully populated student record
    pub fn student(
        id: impl Into<String>,
        name: impl Into<String>,
        surname: impl Into<String>,
        tel: impl Into<String>,
        student_id: impl Into<String>,
    ) -> Self {
        let mut record = Self::person(id, name, surname, tel);
        record.variant = VariantFields::Student {
            student_id: Some(student_id.into()),
        };
        record
    }

    pub fn kind(&self) -> MemberKind {
        match self.variant {
            VariantFields::Person => MemberKind::Person,
            VariantFields::Soldier { .. } => MemberKind::Soldier,
            VariantFields::Student { .. } => MemberKind::Student,
        }
    }

    /// Value of a field, `None` when unset or not declared for this kind
    pub fn get(&self, field: FieldName) -> Option<&str> {
        match (field, &self.variant) {
            (FieldName::Id, _) => self.base.id.as_deref(),
            (FieldName::Name, _) => self.base.name.as_deref(),
            (FieldName::Surname, _) => self.base.surname.as_deref(),
            (FieldName::Tel, _) => self.base.tel.as_deref(),
            (FieldName::PersonalNum, VariantFields::Soldier { personal_num }) => {
                personal_num.as_deref()
            }
            (FieldName::StudentId, VariantFields::Student { student_id }) => student_id.as_deref(),
            _ => None,
        }
    }

    /// Storage slot of a field, `None` when the field is not declared for this kind
    pub fn slot_mut(&mut self, field: FieldName) -> Option<&mut Option<String>> {
        match (field, &mut self.variant) {
            (FieldName::Id, _) => Some(&mut self.base.id),
            (FieldName::Name, _) => Some(&mut self.base.name),
            (FieldName::Surname, _) => Some(&mut self.base.surname),
            (FieldName::Tel, _) => Some(&mut self.base.tel),
            (FieldName::PersonalNum, VariantFields::Soldier { personal_num }) => Some(personal_num),
            (FieldName::StudentId, VariantFields::Student { student_id }) => Some(student_id),
            _ => None,
        }
    }

    /// A record without an id never passed validation
    pub fn is_empty(&self) -> bool {
        self.base.id.is_none()
    }

    /// "Name Surname", or a placeholder for blank records
    pub fn display_name(&self) -> String {
        match (self.base.name.as_deref(), self.base.surname.as_deref()) {
            (Some(name), Some(surname)) => format!("{} {}", name, surname),
            (Some(name), None) => name.to_string(),
            (None, Some(surname)) => surname.to_string(),
            (None, None) => "<unnamed>".to_string(),
        }
    }
}

impl fmt::Display for MemberRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} Clubber's Data", self.kind())?;
        for field in self.kind().fields() {
            writeln!(
                f,
                "  {:>12}: {}",
                field.label(),
                self.get(*field).unwrap_or("")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_fields_start_with_base_fields() {
        for kind in MemberKind::ALL {
            let fields = kind.fields();
            assert_eq!(&fields[..4], &FieldName::BASE);
            assert_eq!(fields.get(4).copied(), kind.extra_field());
        }
    }

    #[test]
    fn test_parse_kind_and_field() {
        assert_eq!("Soldier".parse::<MemberKind>().unwrap(), MemberKind::Soldier);
        assert_eq!(
            "tank".parse::<MemberKind>(),
            Err(ParseNameError::UnknownKind("tank".to_string()))
        );
        assert_eq!("personal-num".parse::<FieldName>().unwrap(), FieldName::PersonalNum);
        assert_eq!("student_id".parse::<FieldName>().unwrap(), FieldName::StudentId);
        assert_eq!(
            "email".parse::<FieldName>(),
            Err(ParseNameError::UnknownField("email".to_string()))
        );
    }

    #[test]
    fn test_slot_mut_rejects_foreign_field() {
        let mut person = MemberRecord::blank(MemberKind::Person);
        assert!(person.slot_mut(FieldName::PersonalNum).is_none());

        let mut student = MemberRecord::blank(MemberKind::Student);
        *student.slot_mut(FieldName::StudentId).unwrap() = Some("ABC/12345".to_string());
        assert_eq!(student.get(FieldName::StudentId), Some("ABC/12345"));
        assert!(student.get(FieldName::PersonalNum).is_none());
    }

    #[test]
    fn test_blank_record_is_empty() {
        for kind in MemberKind::ALL {
            let record = MemberRecord::blank(kind);
            assert!(record.is_empty());
            assert_eq!(record.kind(), kind);
        }
        assert!(!MemberRecord::person("1-2345678|2", "John", "Doe", "+(1)23-4567890").is_empty());
    }

    #[test]
    fn test_record_serde_preserves_unset_fields() {
        let record = MemberRecord::blank(MemberKind::Soldier);
        let json = serde_json::to_string(&record).unwrap();
        let back: MemberRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
