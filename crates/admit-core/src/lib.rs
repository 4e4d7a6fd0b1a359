//! Admission Core
//!
//! Pure building blocks of the admission application wizard:
//! - Step identifiers, step records and per-document upload states
//! - One validator per step, plus the review gate that re-runs them
//! - Reachability derivation from persisted records
//! - The transition table of the wizard state machine
//! - The aggregated, fingerprinted submission payload
//!
//! Nothing in this crate performs I/O.
//!
//! # Example
//!
//! ```rust
//! use admit_core::{furthest_reachable, SessionRecords, StepId};
//!
//! let records = SessionRecords::default();
//! assert_eq!(furthest_reachable(&records), StepId::Personal);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod payload;
pub mod state_machine;
pub mod types;
pub mod validation;

pub use error::{ParseError, TransitionError};
pub use payload::ApplicationPayload;
pub use state_machine::{allowed_transitions, validate_transition};
pub use types::{
    AcademicHistory, DocumentKind, DocumentUploads, PersonalInfo, Qualification, SessionRecords,
    StepId, StepRecord, UploadState, WizardState,
};
pub use validation::{
    furthest_reachable, is_reachable, validate, validate_academic, validate_documents,
    validate_personal, validate_review, FieldError, FieldIssue, StepFailure, Validation,
    RECORD_FIELD,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
