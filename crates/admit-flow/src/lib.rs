//! Admission Wizard Flow
//!
//! The stateful half of the admission wizard:
//! - `WizardController`: the step state machine with resume, guarded
//!   advance, back navigation and deep-link redirects
//! - `UploadTracker`: per-document upload state, persisted on completion
//! - `SubmissionCoordinator`: final re-validation, single submission call
//!   and purge on success
//! - Ports for the upload, submission and program catalog services
//! - `WizardConfig`: TOML configuration and store construction
//!
//! # Example
//!
//! ```rust,ignore
//! use admit_flow::{WizardController, WizardPorts};
//!
//! let mut wizard = WizardController::resume(ports, None).await?;
//! wizard.update(StepRecord::Personal(info))?;
//! wizard.advance().await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod controller;
pub mod error;
pub mod ports;
pub mod submission;
pub mod upload;

pub use config::{ConfigError, StorageBackend, WizardConfig};
pub use controller::{ReviewSummary, WizardController, WizardPorts};
pub use error::{CollaboratorError, WizardError};
pub use ports::{
    Program, ProgramCatalog, StaticCatalog, SubmissionAck, SubmissionClient, UploadClient,
    UploadFile,
};
pub use submission::{SubmissionCoordinator, SubmissionReceipt};
pub use upload::{UploadHandle, UploadTracker};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
