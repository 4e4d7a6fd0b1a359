//! Error types for the admission wizard
//!
//! No error here is fatal. Every variant either blocks a transition while
//! keeping all data, or routes the user to the step that needs attention.

use admit_core::{DocumentKind, FieldError, StepFailure, StepId, WizardState};
use admit_store::StoreError;

/// Failure reported by an external collaborator (upload, submission, catalog)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// Service answered with an error status
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// No response within the collaborator's own timeout
    #[error("timed out")]
    Timeout,

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Response did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Main wizard error type
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    /// Current record failed its step validator
    #[error("{step} is invalid: {}", describe(errors))]
    Validation {
        step: StepId,
        errors: Vec<FieldError>,
    },

    /// The step store refused a read or write
    #[error("persistence unavailable: {source}")]
    PersistenceUnavailable {
        /// Step involved (`None` for session-wide reads)
        step: Option<StepId>,
        #[source]
        source: StoreError,
    },

    /// Upload of one document kind failed; other kinds are unaffected
    #[error("upload of {kind} failed: {reason}")]
    UploadFailed { kind: DocumentKind, reason: String },

    /// A transfer for this kind is already outstanding
    #[error("upload of {0} already in progress")]
    UploadInProgress(DocumentKind),

    /// Transfers still outstanding; review and submission wait for them
    #[error("uploads still in progress: {}", describe(kinds))]
    UploadsOutstanding { kinds: Vec<DocumentKind> },

    /// Final re-validation failed; the user must revisit the step
    #[error("application incomplete: {0} needs attention")]
    IncompleteApplication(StepId),

    /// Submission service failed; every record is still persisted
    #[error("submission failed: {0}")]
    SubmissionFailed(#[source] CollaboratorError),

    /// Operation not defined from the current state
    #[error("cannot {action} from {from}")]
    InvalidTransition {
        from: WizardState,
        action: &'static str,
    },

    /// Record handed to a screen belongs to another step
    #[error("record for {actual} given while on {expected}")]
    StepMismatch { expected: StepId, actual: StepId },

    /// Payload could not be serialized
    #[error("payload encoding failed: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Read-only collaborator (program catalog) failed
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}

fn describe<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl WizardError {
    /// Wrap a store failure
    pub fn persistence(step: Option<StepId>, source: StoreError) -> Self {
        Self::PersistenceUnavailable { step, source }
    }

    /// Check if retrying the same action may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::PersistenceUnavailable { .. }
                | Self::UploadFailed { .. }
                | Self::UploadsOutstanding { .. }
                | Self::SubmissionFailed(_)
                | Self::Collaborator(_)
        )
    }

    /// Step the user should be routed to, if any
    #[must_use]
    pub fn redirect_to(&self) -> Option<StepId> {
        match self {
            Self::IncompleteApplication(step) => Some(*step),
            Self::UploadsOutstanding { .. } => Some(StepId::Documents),
            _ => None,
        }
    }

    /// Field errors carried by a validation failure
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation { errors, .. } => errors,
            _ => &[],
        }
    }
}

impl From<StepFailure> for WizardError {
    fn from(failure: StepFailure) -> Self {
        Self::Validation {
            step: failure.step,
            errors: failure.errors,
        }
    }
}
