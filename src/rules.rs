//! Field validation rules
//!
//! One anchored pattern per field. A kind's rule set is the base rule set (id, name,
//! surname, tel) with the kind's own rule appended. Validation walks the rule set in
//! declaration order and stops at the first field that does not match.

use std::sync::LazyLock;

use club_types::{FieldName, MemberKind, MemberRecord};
use regex::Regex;

use crate::error::ValidationError;

// =============================================================================
// FIELD PATTERNS
// =============================================================================

// `[0-9]` rather than `\d`: regex's `\d` is Unicode-aware.

/// `d-ddddddd|d`, check digit 1-9
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]-[0-9]{7}\|[1-9]$").unwrap());

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][a-z]+$").unwrap());

/// Capitalised parts, each optionally followed by an apostrophe or hyphen
static SURNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Z][a-z]*['-]?)+$").unwrap());

/// `+(country)area-number`, no leading zeros
static TEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+\([1-9][0-9]{0,2}\)[1-9][0-9]{0,2}-[1-9][0-9]{6}$").unwrap()
});

/// Branch letter R, O or C, then seven digits
static PERSONAL_NUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ROC]/[1-9][0-9]{6}$").unwrap());

/// Three-letter faculty code, then five digits
static STUDENT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{3}/[1-9][0-9]{4}$").unwrap());

// =============================================================================
// RULES
// =============================================================================

/// Pattern a single field must match in full
#[derive(Clone, Copy)]
pub struct FieldRule {
    pub field: FieldName,
    pattern: &'static LazyLock<Regex>,
}

impl FieldRule {
    /// Rule for a field
    pub fn for_field(field: FieldName) -> Self {
        let pattern = match field {
            FieldName::Id => &ID_RE,
            FieldName::Name => &NAME_RE,
            FieldName::Surname => &SURNAME_RE,
            FieldName::Tel => &TEL_RE,
            FieldName::PersonalNum => &PERSONAL_NUM_RE,
            FieldName::StudentId => &STUDENT_ID_RE,
        };
        Self { field, pattern }
    }

    /// Unset values never match
    pub fn matches(&self, value: Option<&str>) -> bool {
        value.is_some_and(|v| self.pattern.is_match(v))
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl std::fmt::Debug for FieldRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldRule")
            .field("field", &self.field)
            .field("pattern", &self.pattern())
            .finish()
    }
}

/// Rules shared by every kind
pub fn base_rules() -> [FieldRule; 4] {
    FieldName::BASE.map(FieldRule::for_field)
}

/// Full rule set of a kind, in the order the fields are declared
pub fn rule_set(kind: MemberKind) -> Vec<FieldRule> {
    base_rules()
        .into_iter()
        .chain(kind.extra_field().map(FieldRule::for_field))
        .collect()
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Check the base fields, stopping at the first mismatch
pub fn validate_base(record: &MemberRecord) -> Result<(), ValidationError> {
    check_all(record, &base_rules())
}

/// Check the kind's own field
pub fn validate_extra(record: &MemberRecord) -> Result<(), ValidationError> {
    match record.kind().extra_field() {
        Some(field) => check_all(record, &[FieldRule::for_field(field)]),
        None => Ok(()),
    }
}

/// Validate a whole record: base rules first, the kind's own rule only if they pass
pub fn validate(record: &MemberRecord) -> Result<(), ValidationError> {
    validate_base(record)?;
    validate_extra(record)
}

fn check_all(record: &MemberRecord, rules: &[FieldRule]) -> Result<(), ValidationError> {
    match rules.iter().find(|rule| !rule.matches(record.get(rule.field))) {
        Some(rule) => Err(ValidationError { field: rule.field }),
        None => Ok(()),
    }
}
