//! Error types for the step store
//!
//! Two layers:
//! - `KvError`: failures of the underlying key-value medium
//! - `StoreError`: step-level failures surfaced to the wizard

use admit_core::StepId;
use std::path::PathBuf;

/// Key-value medium failures
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// Medium disabled or unreachable
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Write would exceed the medium's quota
    #[error("quota exceeded writing '{key}': {needed} bytes needed, limit {limit}")]
    QuotaExceeded {
        key: String,
        needed: usize,
        limit: usize,
    },

    /// Key not representable on the medium
    #[error("invalid key: '{0}'")]
    InvalidKey(String),

    /// IO error on a file-backed medium
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl KvError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Step store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The medium refused the operation; the previous record is intact
    #[error("persistence unavailable for {}: {source}", step_label(*.step))]
    Unavailable {
        /// Step being written or read (`None` for purge)
        step: Option<StepId>,
        #[source]
        source: KvError,
    },

    /// Persisted bytes do not decode as the step's record
    #[error("corrupt record for {step}: {source}")]
    Corrupt {
        step: StepId,
        #[source]
        source: serde_json::Error,
    },

    /// Record could not be encoded
    #[error("cannot encode record for {step}: {source}")]
    Encode {
        step: StepId,
        #[source]
        source: serde_json::Error,
    },

    /// The step has no persisted record (review)
    #[error("{0} is never persisted")]
    NotPersisted(StepId),
}

fn step_label(step: Option<StepId>) -> String {
    step.map_or_else(|| "all steps".to_string(), |s| s.to_string())
}

impl StoreError {
    /// Wrap a medium failure for a step
    pub fn unavailable(step: Option<StepId>, source: KvError) -> Self {
        Self::Unavailable { step, source }
    }

    /// Whether the medium itself failed (as opposed to the data)
    #[inline]
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}
