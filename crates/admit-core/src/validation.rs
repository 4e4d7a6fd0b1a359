//! Step validators
//!
//! One pure function per step. Validators never mutate state and never
//! perform I/O; the verdict depends only on the record handed in, so callers
//! recompute it on every read instead of caching it.

use crate::types::{
    AcademicHistory, DocumentUploads, PersonalInfo, Qualification, SessionRecords, StepId,
    StepRecord,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

/// Pseudo-field used when a whole record is absent or malformed
pub const RECORD_FIELD: &str = "record";

/// Why a field failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldIssue {
    /// Required value is blank or absent
    Missing,
    /// Value present but badly shaped
    Malformed,
    /// Value outside the accepted enumeration
    NotInEnum,
    /// Document not uploaded yet
    NotUploaded,
}

/// Field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldError {
    /// Wire name of the field (or document kind)
    pub field: &'static str,
    /// Kind of failure
    pub issue: FieldIssue,
}

impl FieldError {
    /// Create new field error
    #[inline]
    #[must_use]
    pub fn new(field: &'static str, issue: FieldIssue) -> Self {
        Self { field, issue }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self.issue {
            FieldIssue::Missing => "is required",
            FieldIssue::Malformed => "is malformed",
            FieldIssue::NotInEnum => "is not an accepted value",
            FieldIssue::NotUploaded => "has not been uploaded",
        };
        write!(f, "{} {}", self.field, reason)
    }
}

/// Verdict of a step validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Record is complete
    Valid,
    /// Record fails; carries every failing field
    Invalid(Vec<FieldError>),
}

impl Validation {
    fn from_errors(errors: Vec<FieldError>) -> Self {
        if errors.is_empty() {
            Validation::Valid
        } else {
            Validation::Invalid(errors)
        }
    }

    /// Whether the record passed
    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Validation::Valid)
    }

    /// Failing fields (empty when valid)
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        match self {
            Validation::Valid => &[],
            Validation::Invalid(errors) => errors,
        }
    }

    /// Attach the step, turning the verdict into a result
    pub fn into_result(self, step: StepId) -> Result<(), StepFailure> {
        match self {
            Validation::Valid => Ok(()),
            Validation::Invalid(errors) => Err(StepFailure { step, errors }),
        }
    }
}

/// A step that failed validation, with its field errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// Failing step
    pub step: StepId,
    /// Field errors for that step
    pub errors: Vec<FieldError>,
}

fn require(errors: &mut Vec<FieldError>, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, FieldIssue::Missing));
        false
    } else {
        true
    }
}

/// Validate a record for the given step
///
/// A record belonging to another step is reported as a malformed record.
/// The review step has no record of its own; see [`validate_review`].
#[must_use]
pub fn validate(step: StepId, record: &StepRecord) -> Validation {
    match (step, record) {
        (StepId::Personal, StepRecord::Personal(r)) => validate_personal(r),
        (StepId::Academic, StepRecord::Academic(r)) => validate_academic(r),
        (StepId::Documents, StepRecord::Documents(r)) => validate_documents(r),
        _ => Validation::Invalid(vec![FieldError::new(RECORD_FIELD, FieldIssue::Malformed)]),
    }
}

/// Step 1: names, email and program required; email must look like an address
#[must_use]
pub fn validate_personal(record: &PersonalInfo) -> Validation {
    let mut errors = Vec::new();
    require(&mut errors, "firstName", &record.first_name);
    require(&mut errors, "lastName", &record.last_name);
    if require(&mut errors, "email", &record.email) && !EMAIL.is_match(record.email.trim()) {
        errors.push(FieldError::new("email", FieldIssue::Malformed));
    }
    require(&mut errors, "program", &record.program);
    Validation::from_errors(errors)
}

/// Step 2: qualification from the fixed set; remaining fields required
#[must_use]
pub fn validate_academic(record: &AcademicHistory) -> Validation {
    let mut errors = Vec::new();
    if require(&mut errors, "highestQualification", &record.highest_qualification)
        && record.highest_qualification.parse::<Qualification>().is_err()
    {
        errors.push(FieldError::new("highestQualification", FieldIssue::NotInEnum));
    }
    require(&mut errors, "institutionName", &record.institution_name);
    require(&mut errors, "fieldOfStudy", &record.field_of_study);
    require(&mut errors, "graduationDate", &record.graduation_date);
    require(&mut errors, "gradeGPA", &record.grade_gpa);
    Validation::from_errors(errors)
}

/// Step 3: every document kind must be done
#[must_use]
pub fn validate_documents(record: &DocumentUploads) -> Validation {
    let errors = record
        .pending_kinds()
        .into_iter()
        .map(|kind| FieldError::new(kind.as_str(), FieldIssue::NotUploaded))
        .collect();
    Validation::from_errors(errors)
}

/// Step 4: re-run the step 1..3 validators against the persisted records
///
/// Returns the first failing step in wizard order. An absent record fails
/// with a missing [`RECORD_FIELD`].
pub fn validate_review(records: &SessionRecords) -> Result<(), StepFailure> {
    for step in StepId::PERSISTED {
        match records.record(step) {
            Some(record) => validate(step, &record).into_result(step)?,
            None => {
                return Err(StepFailure {
                    step,
                    errors: vec![FieldError::new(RECORD_FIELD, FieldIssue::Missing)],
                })
            }
        }
    }
    Ok(())
}

/// Furthest step whose predecessors are all persisted and valid
///
/// Walks steps 1..3 in order and stops at the first one that is absent or
/// invalid; when all three validate the review step is reachable.
#[must_use]
pub fn furthest_reachable(records: &SessionRecords) -> StepId {
    for step in StepId::PERSISTED {
        let valid = records
            .record(step)
            .is_some_and(|record| validate(step, &record).is_valid());
        if !valid {
            return step;
        }
    }
    StepId::Review
}

/// Whether `target` may be entered given the persisted records
#[must_use]
pub fn is_reachable(target: StepId, records: &SessionRecords) -> bool {
    target <= furthest_reachable(records)
}
