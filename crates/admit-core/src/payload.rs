//! Aggregated submission payload
//!
//! The union of the step 1 and step 2 fields plus the satisfied document
//! map. Built only from records that pass the review validator, and
//! deterministic for a given set of records so a retried submission sends
//! an identical body.

use crate::types::{AcademicHistory, DocumentKind, PersonalInfo, SessionRecords, StepId};
use crate::validation::{validate_review, FieldError, FieldIssue, StepFailure, RECORD_FIELD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Body sent to the submission service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPayload {
    #[serde(flatten)]
    pub personal: PersonalInfo,
    #[serde(flatten)]
    pub academic: AcademicHistory,
    /// Document kind to content URL
    pub documents: BTreeMap<DocumentKind, String>,
}

impl ApplicationPayload {
    /// Validate the persisted records and aggregate them
    pub fn aggregate(records: &SessionRecords) -> Result<Self, StepFailure> {
        validate_review(records)?;
        match (&records.personal, &records.academic, &records.documents) {
            (Some(personal), Some(academic), Some(documents)) => Ok(Self {
                personal: personal.clone(),
                academic: academic.clone(),
                documents: documents.satisfied(),
            }),
            // validate_review reports absent records, so this arm is never taken
            _ => Err(StepFailure {
                step: StepId::Personal,
                errors: vec![FieldError::new(RECORD_FIELD, FieldIssue::Missing)],
            }),
        }
    }

    /// Canonical JSON body
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Hex SHA-256 of the canonical body
    ///
    /// Identical records always produce the same fingerprint.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let body = self.to_json()?;
        Ok(hex::encode(Sha256::digest(&body)))
    }
}
