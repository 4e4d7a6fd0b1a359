//! Durable step store
//!
//! Holds one serialized record per persisted step under a fixed key. This is
//! the only component that encodes or decodes stored bytes; everything above
//! it works with typed records.

use crate::error::StoreError;
use crate::kv::KvPort;
use admit_core::{
    AcademicHistory, DocumentUploads, PersonalInfo, SessionRecords, StepId, StepRecord,
};
use std::fmt::Debug;
use std::sync::Arc;

/// Default key namespace
pub const DEFAULT_KEY_PREFIX: &str = "admission";

/// Whole-record persistence for wizard steps
#[async_trait::async_trait]
pub trait StepStore: Send + Sync + Debug {
    /// Persist a record under its step, replacing any previous value
    ///
    /// # Errors
    /// - `StoreError::Unavailable` if the medium refused the write; the
    ///   previous record is left intact
    async fn save(&self, record: &StepRecord) -> Result<(), StoreError>;

    /// Read the record of a step
    ///
    /// # Errors
    /// - `StoreError::Corrupt` if stored bytes do not decode
    /// - `StoreError::Unavailable` if the medium cannot be read
    async fn load(&self, step: StepId) -> Result<Option<StepRecord>, StoreError>;

    /// Remove every step's record
    async fn purge_all(&self) -> Result<(), StoreError>;

    /// Read steps 1..3 in order
    ///
    /// A corrupt record is returned as the empty record of its step: it is
    /// present (so the session counts as started) but never validates.
    async fn load_session(&self) -> Result<SessionRecords, StoreError> {
        let mut records = SessionRecords::default();
        for step in StepId::PERSISTED {
            match self.load(step).await {
                Ok(Some(record)) => records.insert(record),
                Ok(None) => {}
                Err(StoreError::Corrupt { step, source }) => {
                    tracing::warn!(%step, error = %source, "Discarding corrupt step record");
                    if let Some(empty) = StepRecord::empty(step) {
                        records.insert(empty);
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl<T: StepStore + ?Sized> StepStore for Arc<T> {
    async fn save(&self, record: &StepRecord) -> Result<(), StoreError> {
        (**self).save(record).await
    }

    async fn load(&self, step: StepId) -> Result<Option<StepRecord>, StoreError> {
        (**self).load(step).await
    }

    async fn purge_all(&self) -> Result<(), StoreError> {
        (**self).purge_all().await
    }
}

/// [`StepStore`] over a [`KvPort`]
///
/// Keys are `<prefix>.step<N>`; values are the JSON of the step record.
#[derive(Debug)]
pub struct DurableStepStore<K> {
    kv: K,
    prefix: String,
}

impl<K: KvPort> DurableStepStore<K> {
    /// Create store with the default key prefix
    #[inline]
    #[must_use]
    pub fn new(kv: K) -> Self {
        Self::with_prefix(kv, DEFAULT_KEY_PREFIX)
    }

    /// Create store with a custom key prefix
    #[inline]
    #[must_use]
    pub fn with_prefix(kv: K, prefix: impl Into<String>) -> Self {
        Self {
            kv,
            prefix: prefix.into(),
        }
    }

    /// Storage key of a step
    #[must_use]
    pub fn key(&self, step: StepId) -> String {
        format!("{}.step{}", self.prefix, step.number())
    }

    /// Underlying medium
    #[inline]
    #[must_use]
    pub fn kv(&self) -> &K {
        &self.kv
    }

    fn decode(step: StepId, raw: &str) -> Result<StepRecord, StoreError> {
        let corrupt = |source| StoreError::Corrupt { step, source };
        match step {
            StepId::Personal => serde_json::from_str::<PersonalInfo>(raw)
                .map(StepRecord::Personal)
                .map_err(corrupt),
            StepId::Academic => serde_json::from_str::<AcademicHistory>(raw)
                .map(StepRecord::Academic)
                .map_err(corrupt),
            StepId::Documents => serde_json::from_str::<DocumentUploads>(raw)
                .map(StepRecord::Documents)
                .map_err(corrupt),
            StepId::Review => Err(StoreError::NotPersisted(step)),
        }
    }
}

#[async_trait::async_trait]
impl<K: KvPort> StepStore for DurableStepStore<K> {
    async fn save(&self, record: &StepRecord) -> Result<(), StoreError> {
        let step = record.step_id();
        let value =
            serde_json::to_string(record).map_err(|source| StoreError::Encode { step, source })?;
        let key = self.key(step);
        tracing::debug!(%step, key = %key, bytes = value.len(), "Saving step record");
        self.kv
            .set(&key, value)
            .await
            .map_err(|e| StoreError::unavailable(Some(step), e))
    }

    async fn load(&self, step: StepId) -> Result<Option<StepRecord>, StoreError> {
        if !step.is_persisted() {
            return Ok(None);
        }
        let key = self.key(step);
        let raw = self
            .kv
            .get(&key)
            .await
            .map_err(|e| StoreError::unavailable(Some(step), e))?;
        tracing::debug!(%step, key = %key, found = raw.is_some(), "Loaded step record");
        raw.map(|raw| Self::decode(step, &raw)).transpose()
    }

    async fn purge_all(&self) -> Result<(), StoreError> {
        let mut first_error = None;
        for step in StepId::PERSISTED {
            if let Err(e) = self.kv.remove(&self.key(step)).await {
                tracing::warn!(%step, error = %e, "Failed to remove step record");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(StoreError::unavailable(None, e)),
            None => {
                tracing::debug!(prefix = %self.prefix, "Purged all step records");
                Ok(())
            }
        }
    }
}
