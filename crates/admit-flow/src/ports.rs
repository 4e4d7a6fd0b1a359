//! External collaborators
//!
//! Interfaces only: the upload service, the application submission service
//! and the read-only program catalog. HTTP implementations live in
//! `admit-http`; fakes live in `admit-test-utils`.

use crate::error::CollaboratorError;
use admit_core::ApplicationPayload;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Binary handed to the upload service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name
    pub name: String,
    /// MIME type
    pub content_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl UploadFile {
    /// Create new upload file
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Accepts a binary and returns its content URL
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UploadClient: Send + Sync {
    /// Upload a file
    async fn upload(&self, file: UploadFile) -> Result<String, CollaboratorError>;
}

/// Acknowledgement from the submission service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionAck {
    /// Service-assigned application reference
    pub reference: String,
}

/// Accepts the aggregated application
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SubmissionClient: Send + Sync {
    /// Submit an application
    ///
    /// `fingerprint` identifies the payload so the service can recognize a
    /// retried submission.
    async fn submit_application(
        &self,
        payload: &ApplicationPayload,
        fingerprint: &str,
    ) -> Result<SubmissionAck, CollaboratorError>;
}

/// Program catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// Read-only program catalog
#[async_trait::async_trait]
pub trait ProgramCatalog: Send + Sync {
    /// Look up a program by identifier
    async fn get_program(&self, id: &str) -> Result<Option<Program>, CollaboratorError>;
}

/// In-memory catalog (from configuration or fixtures)
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    programs: HashMap<String, Program>,
}

impl StaticCatalog {
    /// Create catalog from entries; later duplicates win
    #[must_use]
    pub fn new(programs: impl IntoIterator<Item = Program>) -> Self {
        Self {
            programs: programs.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Number of programs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Whether the catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }
}

#[async_trait::async_trait]
impl ProgramCatalog for StaticCatalog {
    async fn get_program(&self, id: &str) -> Result<Option<Program>, CollaboratorError> {
        Ok(self.programs.get(id.trim()).cloned())
    }
}
