//! Core types for the admission wizard
//!
//! Defines the fundamental types shared by every layer:
//! - Step identifiers and wizard states
//! - Per-step records (personal, academic, documents)
//! - Document kinds and their upload states
//! - The set of records persisted for one session

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the four ordered stages of the application wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepId {
    /// Step 1: personal information
    Personal,
    /// Step 2: academic history
    Academic,
    /// Step 3: document uploads
    Documents,
    /// Step 4: review and submit (derived, never stored)
    Review,
}

impl StepId {
    /// All steps in wizard order
    pub const ALL: [StepId; 4] = [
        StepId::Personal,
        StepId::Academic,
        StepId::Documents,
        StepId::Review,
    ];

    /// Steps that own a persisted record
    pub const PERSISTED: [StepId; 3] = [StepId::Personal, StepId::Academic, StepId::Documents];

    /// 1-based position of the step
    #[inline]
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            StepId::Personal => 1,
            StepId::Academic => 2,
            StepId::Documents => 3,
            StepId::Review => 4,
        }
    }

    /// Step at a 1-based position
    #[must_use]
    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }

    /// Following step, if any
    #[inline]
    #[must_use]
    pub fn next(self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }

    /// Preceding step, if any
    #[inline]
    #[must_use]
    pub fn previous(self) -> Option<Self> {
        Self::from_number(self.number() - 1)
    }

    /// Whether this step owns a persisted record
    #[inline]
    #[must_use]
    pub fn is_persisted(self) -> bool {
        !matches!(self, StepId::Review)
    }

    /// Steps that must be persisted and valid before this one is reachable
    #[must_use]
    pub fn predecessors(self) -> &'static [StepId] {
        &Self::PERSISTED[..usize::from(self.number() - 1)]
    }

    /// Short lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StepId::Personal => "personal",
            StepId::Academic => "academic",
            StepId::Documents => "documents",
            StepId::Review => "review",
        }
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.as_str())
    }
}

impl FromStr for StepId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<u8>() {
            return Self::from_number(n).ok_or_else(|| ParseError::UnknownStep(s.to_string()));
        }
        Self::ALL
            .into_iter()
            .find(|step| step.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::UnknownStep(s.to_string()))
    }
}

/// Fixed set of documents an applicant must upload in step 3
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    /// Identity and mandatory paperwork
    RequiredDocs,
    /// Academic transcripts
    Transcripts,
    /// Letters of recommendation
    RecommendationLetters,
    /// Personal statement
    PersonalEssay,
}

impl DocumentKind {
    /// All document kinds, in display order
    pub const ALL: [DocumentKind; 4] = [
        DocumentKind::RequiredDocs,
        DocumentKind::Transcripts,
        DocumentKind::RecommendationLetters,
        DocumentKind::PersonalEssay,
    ];

    /// Wire name (matches the record field name)
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::RequiredDocs => "requiredDocs",
            DocumentKind::Transcripts => "transcripts",
            DocumentKind::RecommendationLetters => "recommendationLetters",
            DocumentKind::PersonalEssay => "personalEssay",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| ParseError::UnknownDocument(s.to_string()))
    }
}

/// Transfer status of one document
///
/// A document kind is satisfied only in the `Done` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "uri", rename_all = "snake_case")]
pub enum UploadState {
    /// Nothing uploaded yet
    #[default]
    Pending,
    /// Transfer in flight
    Uploading,
    /// Uploaded; holds the content URL returned by the upload service
    Done(String),
}

impl UploadState {
    /// Whether the document is uploaded
    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        matches!(self, UploadState::Done(_))
    }

    /// Content URL when done
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        match self {
            UploadState::Done(uri) => Some(uri),
            _ => None,
        }
    }
}

static PENDING: UploadState = UploadState::Pending;

/// Academic qualification levels accepted in step 2
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qualification {
    /// Secondary school certificate
    HighSchool,
    /// Post-secondary diploma
    Diploma,
    /// Associate degree
    Associate,
    /// Bachelor's degree
    Bachelor,
    /// Master's degree
    Master,
    /// Doctoral degree
    Doctorate,
}

impl Qualification {
    /// All accepted levels
    pub const ALL: [Qualification; 6] = [
        Qualification::HighSchool,
        Qualification::Diploma,
        Qualification::Associate,
        Qualification::Bachelor,
        Qualification::Master,
        Qualification::Doctorate,
    ];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Qualification::HighSchool => "high_school",
            Qualification::Diploma => "diploma",
            Qualification::Associate => "associate",
            Qualification::Bachelor => "bachelor",
            Qualification::Master => "master",
            Qualification::Doctorate => "doctorate",
        }
    }
}

impl FromStr for Qualification {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == s.trim())
            .ok_or_else(|| ParseError::UnknownQualification(s.to_string()))
    }
}

/// Step 1 record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_birth: String,
    /// Identifier into the program catalog
    pub program: String,
}

/// Step 2 record
///
/// `highest_qualification` keeps the raw string so an out-of-range value
/// surfaces as a field error rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AcademicHistory {
    pub highest_qualification: String,
    pub institution_name: String,
    pub field_of_study: String,
    pub graduation_date: String,
    #[serde(rename = "gradeGPA")]
    pub grade_gpa: String,
}

/// Step 3 record: upload state per document kind
///
/// Kinds missing from the map count as `Pending`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentUploads {
    documents: BTreeMap<DocumentKind, UploadState>,
}

impl DocumentUploads {
    /// All kinds pending
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: DocumentKind::ALL
                .into_iter()
                .map(|kind| (kind, UploadState::Pending))
                .collect(),
        }
    }

    /// State of one kind
    #[must_use]
    pub fn state(&self, kind: DocumentKind) -> &UploadState {
        self.documents.get(&kind).unwrap_or(&PENDING)
    }

    /// Replace the state of one kind
    pub fn set(&mut self, kind: DocumentKind, state: UploadState) {
        self.documents.insert(kind, state);
    }

    /// With a kind set (builder style)
    #[must_use]
    pub fn with(mut self, kind: DocumentKind, state: UploadState) -> Self {
        self.set(kind, state);
        self
    }

    /// Every kind is done
    #[must_use]
    pub fn is_complete(&self) -> bool {
        DocumentKind::ALL.into_iter().all(|kind| self.state(kind).is_done())
    }

    /// Kinds not yet done
    #[must_use]
    pub fn pending_kinds(&self) -> Vec<DocumentKind> {
        DocumentKind::ALL
            .into_iter()
            .filter(|kind| !self.state(*kind).is_done())
            .collect()
    }

    /// Content URLs of the done kinds
    #[must_use]
    pub fn satisfied(&self) -> BTreeMap<DocumentKind, String> {
        DocumentKind::ALL
            .into_iter()
            .filter_map(|kind| self.state(kind).uri().map(|uri| (kind, uri.to_string())))
            .collect()
    }

    /// Copy with in-flight transfers reset to `Pending`
    ///
    /// A transfer never survives a reload, so a persisted `Uploading` is stale.
    #[must_use]
    pub fn normalized(&self) -> Self {
        let documents = DocumentKind::ALL
            .into_iter()
            .map(|kind| {
                let state = match self.state(kind) {
                    UploadState::Uploading => UploadState::Pending,
                    other => other.clone(),
                };
                (kind, state)
            })
            .collect();
        Self { documents }
    }

    /// Iterate over every kind with its state
    pub fn iter(&self) -> impl Iterator<Item = (DocumentKind, &UploadState)> + '_ {
        DocumentKind::ALL.into_iter().map(move |kind| (kind, self.state(kind)))
    }
}

impl Default for DocumentUploads {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted data for one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepRecord {
    /// Step 1
    Personal(PersonalInfo),
    /// Step 2
    Academic(AcademicHistory),
    /// Step 3
    Documents(DocumentUploads),
}

impl StepRecord {
    /// Step the record belongs to
    #[must_use]
    pub fn step_id(&self) -> StepId {
        match self {
            StepRecord::Personal(_) => StepId::Personal,
            StepRecord::Academic(_) => StepId::Academic,
            StepRecord::Documents(_) => StepId::Documents,
        }
    }

    /// Empty defaults for a step screen (`None` for review)
    #[must_use]
    pub fn empty(step: StepId) -> Option<Self> {
        match step {
            StepId::Personal => Some(StepRecord::Personal(PersonalInfo::default())),
            StepId::Academic => Some(StepRecord::Academic(AcademicHistory::default())),
            StepId::Documents => Some(StepRecord::Documents(DocumentUploads::new())),
            StepId::Review => None,
        }
    }
}

impl From<PersonalInfo> for StepRecord {
    fn from(value: PersonalInfo) -> Self {
        StepRecord::Personal(value)
    }
}

impl From<AcademicHistory> for StepRecord {
    fn from(value: AcademicHistory) -> Self {
        StepRecord::Academic(value)
    }
}

impl From<DocumentUploads> for StepRecord {
    fn from(value: DocumentUploads) -> Self {
        StepRecord::Documents(value)
    }
}

/// Records currently persisted for one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionRecords {
    pub personal: Option<PersonalInfo>,
    pub academic: Option<AcademicHistory>,
    pub documents: Option<DocumentUploads>,
}

impl SessionRecords {
    /// Record for a step, if persisted
    #[must_use]
    pub fn record(&self, step: StepId) -> Option<StepRecord> {
        match step {
            StepId::Personal => self.personal.clone().map(StepRecord::Personal),
            StepId::Academic => self.academic.clone().map(StepRecord::Academic),
            StepId::Documents => self.documents.clone().map(StepRecord::Documents),
            StepId::Review => None,
        }
    }

    /// Place a record in its slot
    pub fn insert(&mut self, record: StepRecord) {
        match record {
            StepRecord::Personal(r) => self.personal = Some(r),
            StepRecord::Academic(r) => self.academic = Some(r),
            StepRecord::Documents(r) => self.documents = Some(r),
        }
    }

    /// Nothing persisted at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.personal.is_none() && self.academic.is_none() && self.documents.is_none()
    }
}

/// Wizard state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardState {
    /// On a step screen
    At(StepId),
    /// Terminal: application submitted
    Submitted,
}

impl WizardState {
    /// Current step, if not terminal
    #[inline]
    #[must_use]
    pub fn step(self) -> Option<StepId> {
        match self {
            WizardState::At(step) => Some(step),
            WizardState::Submitted => None,
        }
    }

    /// Whether the state is absorbing
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, WizardState::Submitted)
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardState::At(step) => step.fmt(f),
            WizardState::Submitted => f.write_str("submitted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_numbering_round_trips() {
        for step in StepId::ALL {
            assert_eq!(StepId::from_number(step.number()), Some(step));
        }
        assert_eq!(StepId::from_number(0), None);
        assert_eq!(StepId::from_number(5), None);
    }

    #[test]
    fn step_neighbours() {
        assert_eq!(StepId::Personal.previous(), None);
        assert_eq!(StepId::Personal.next(), Some(StepId::Academic));
        assert_eq!(StepId::Review.next(), None);
        assert_eq!(StepId::Review.previous(), Some(StepId::Documents));
    }

    #[test]
    fn step_predecessors() {
        assert!(StepId::Personal.predecessors().is_empty());
        assert_eq!(
            StepId::Review.predecessors(),
            &[StepId::Personal, StepId::Academic, StepId::Documents]
        );
    }

    #[test]
    fn step_parses_names_and_numbers() {
        assert_eq!("2".parse::<StepId>().unwrap(), StepId::Academic);
        assert_eq!("Review".parse::<StepId>().unwrap(), StepId::Review);
        assert!("9".parse::<StepId>().is_err());
        assert!("payment".parse::<StepId>().is_err());
    }

    #[test]
    fn document_kind_parses_loose_spellings() {
        assert_eq!(
            "recommendation-letters".parse::<DocumentKind>().unwrap(),
            DocumentKind::RecommendationLetters
        );
        assert_eq!(
            "personal_essay".parse::<DocumentKind>().unwrap(),
            DocumentKind::PersonalEssay
        );
        assert!("photo".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn missing_kinds_count_as_pending() {
        let uploads: DocumentUploads = serde_json::from_str(
            r#"{"transcripts":{"status":"done","uri":"https://cdn/t.pdf"}}"#,
        )
        .unwrap();

        assert_eq!(uploads.state(DocumentKind::RequiredDocs), &UploadState::Pending);
        assert_eq!(uploads.state(DocumentKind::Transcripts).uri(), Some("https://cdn/t.pdf"));
        assert_eq!(uploads.pending_kinds().len(), 3);
    }

    #[test]
    fn normalized_resets_in_flight_transfers() {
        let uploads = DocumentUploads::new()
            .with(DocumentKind::Transcripts, UploadState::Uploading)
            .with(DocumentKind::PersonalEssay, UploadState::Done("u".into()));

        let normalized = uploads.normalized();
        assert_eq!(normalized.state(DocumentKind::Transcripts), &UploadState::Pending);
        assert!(normalized.state(DocumentKind::PersonalEssay).is_done());
    }

    #[test]
    fn academic_uses_wire_field_names() {
        let json = serde_json::to_value(AcademicHistory {
            grade_gpa: "3.8".into(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(json["gradeGPA"], "3.8");
        assert!(json.get("highestQualification").is_some());
    }

    #[test]
    fn session_records_insert_and_read() {
        let mut records = SessionRecords::default();
        assert!(records.is_empty());

        records.insert(StepRecord::Documents(DocumentUploads::new()));
        assert!(records.record(StepId::Documents).is_some());
        assert!(records.record(StepId::Review).is_none());
    }
}
