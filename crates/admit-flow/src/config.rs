//! Wizard configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! request_timeout_secs = 30
//!
//! [storage]
//! backend = "file"
//! dir = "/var/lib/admit"
//! key_prefix = "admission"
//!
//! [upload]
//! endpoint = "https://uploads.example.edu/files"
//!
//! [submission]
//! endpoint = "https://apply.example.edu/applications"
//!
//! [[programs]]
//! id = "cs-msc"
//! title = "MSc Computer Science"
//! department = "Informatics"
//! ```

use crate::ports::{Program, StaticCatalog};
use admit_store::{DurableStepStore, FileKv, MemoryKv, StepStore, DEFAULT_KEY_PREFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default collaborator timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Step store medium
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Lives as long as the process
    #[default]
    Memory,
    /// One JSON file per step under `dir`
    File,
}

/// Storage section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub dir: Option<PathBuf>,
    pub key_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            dir: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

/// Collaborator endpoint section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub endpoint: Option<String>,
}

/// Wizard configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    pub storage: StorageConfig,
    pub upload: EndpointConfig,
    pub submission: EndpointConfig,
    pub request_timeout_secs: u64,
    pub programs: Vec<Program>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            upload: EndpointConfig::default(),
            submission: EndpointConfig::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            programs: Vec::new(),
        }
    }
}

impl WizardConfig {
    /// Create default configuration (in-memory storage)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), backend = ?config.storage.backend, "Loaded configuration");
        Ok(config)
    }

    /// Check for unsupported combinations
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::File && self.storage.dir.is_none() {
            return Err(ConfigError::Invalid(
                "storage.dir is required for the file backend".into(),
            ));
        }
        if self.storage.key_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.key_prefix must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Use file storage under `dir`
    #[inline]
    #[must_use]
    pub fn with_file_storage(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.backend = StorageBackend::File;
        self.storage.dir = Some(dir.into());
        self
    }

    /// Set key prefix
    #[inline]
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.storage.key_prefix = prefix.into();
        self
    }

    /// Set upload endpoint
    #[inline]
    #[must_use]
    pub fn with_upload_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.upload.endpoint = Some(endpoint.into());
        self
    }

    /// Set submission endpoint
    #[inline]
    #[must_use]
    pub fn with_submission_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.submission.endpoint = Some(endpoint.into());
        self
    }

    /// Set collaborator timeout
    #[inline]
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Add a program to the static catalog
    #[inline]
    #[must_use]
    pub fn with_program(mut self, program: Program) -> Self {
        self.programs.push(program);
        self
    }

    /// Collaborator timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Program catalog from the configured entries
    #[must_use]
    pub fn catalog(&self) -> StaticCatalog {
        StaticCatalog::new(self.programs.iter().cloned())
    }

    /// Build the step store for the configured backend
    pub fn build_store(&self) -> Result<Arc<dyn StepStore>, ConfigError> {
        self.validate()?;
        let prefix = self.storage.key_prefix.clone();
        let store: Arc<dyn StepStore> = match (self.storage.backend, &self.storage.dir) {
            (StorageBackend::Memory, _) => {
                Arc::new(DurableStepStore::with_prefix(MemoryKv::new(), prefix))
            }
            (StorageBackend::File, Some(dir)) => {
                Arc::new(DurableStepStore::with_prefix(FileKv::new(dir.clone()), prefix))
            }
            (StorageBackend::File, None) => {
                return Err(ConfigError::Invalid(
                    "storage.dir is required for the file backend".into(),
                ))
            }
        };
        Ok(store)
    }
}
