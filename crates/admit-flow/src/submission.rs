//! Submission coordinator
//!
//! The final integrity gate: re-validates steps 1..3 from storage,
//! aggregates them, calls the submission service exactly once and purges
//! the session only after the service confirmed success.

use crate::error::WizardError;
use crate::ports::SubmissionClient;
use admit_core::ApplicationPayload;
use admit_store::StepStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Outcome of a confirmed submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    /// Reference assigned by the submission service
    pub reference: String,
    /// Fingerprint of the payload that was sent
    pub fingerprint: String,
    /// Whether the local session was purged
    pub purged: bool,
    /// When the service confirmed the submission
    pub submitted_at: DateTime<Utc>,
}

/// Aggregates and submits the application
pub struct SubmissionCoordinator {
    store: Arc<dyn StepStore>,
    client: Arc<dyn SubmissionClient>,
}

impl SubmissionCoordinator {
    /// Create new coordinator
    #[inline]
    #[must_use]
    pub fn new(store: Arc<dyn StepStore>, client: Arc<dyn SubmissionClient>) -> Self {
        Self { store, client }
    }

    /// Build the payload from the persisted records without sending it
    ///
    /// # Errors
    /// - `WizardError::IncompleteApplication` naming the first failing step
    pub async fn prepare(&self) -> Result<ApplicationPayload, WizardError> {
        let records = self
            .store
            .load_session()
            .await
            .map_err(|e| WizardError::persistence(None, e))?;
        ApplicationPayload::aggregate(&records).map_err(|failure| {
            tracing::info!(
                step = %failure.step,
                errors = failure.errors.len(),
                "Final re-validation failed"
            );
            WizardError::IncompleteApplication(failure.step)
        })
    }

    /// Submit the application
    ///
    /// # Workflow
    /// 1. Re-validate steps 1..3 from storage (never a cached verdict)
    /// 2. Aggregate them into one payload
    /// 3. Call the submission service once
    /// 4. On success purge the step store
    ///
    /// On failure every record stays persisted, so retrying re-sends an
    /// identical payload.
    ///
    /// # Errors
    /// - `WizardError::IncompleteApplication` if a step no longer validates
    /// - `WizardError::SubmissionFailed` if the service call failed
    /// - `WizardError::PersistenceUnavailable` if the records cannot be read
    /// - `WizardError::Encoding` if the payload cannot be serialized
    pub async fn submit(&self) -> Result<SubmissionReceipt, WizardError> {
        let payload = self.prepare().await?;
        let fingerprint = payload.fingerprint().map_err(WizardError::Encoding)?;
        tracing::info!(fingerprint = %fingerprint, "Submitting application");

        let ack = self
            .client
            .submit_application(&payload, &fingerprint)
            .await
            .map_err(|e| {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "Submission failed");
                WizardError::SubmissionFailed(e)
            })?;

        // The service accepted the application: re-sending would duplicate
        // it, so a failed purge is reported but does not undo the success.
        let purged = match self.store.purge_all().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(reference = %ack.reference, error = %e, "Purge after submission failed");
                false
            }
        };
        tracing::info!(reference = %ack.reference, purged, "Application submitted");

        Ok(SubmissionReceipt {
            reference: ack.reference,
            fingerprint,
            purged,
            submitted_at: Utc::now(),
        })
    }
}
