//! Wizard controller
//!
//! The state machine of the admission wizard. It owns transition logic and
//! guard evaluation; records are read and written only through the step
//! store.
//!
//! There is no stored "current step" pointer. On every (re)initialization
//! and deep-link entry the reachable step is re-derived from the persisted
//! records and the validators, so a session cannot be pushed past a step
//! whose record is missing, corrupt or invalid.
//!
//! Every operation takes `&mut self`, which rules out two transitions racing
//! on the same record while a save, upload start or submission is awaited.
//! Review is out of reach while a transfer is outstanding, so the session is
//! never submitted (and purged) under a pending step 3 write.

use crate::error::WizardError;
use crate::ports::{ProgramCatalog, SubmissionClient, UploadClient, UploadFile};
use crate::submission::{SubmissionCoordinator, SubmissionReceipt};
use crate::upload::{UploadHandle, UploadTracker};
use admit_core::state_machine::is_backward;
use admit_core::{
    furthest_reachable, validate, validate_review, validate_transition, DocumentKind,
    DocumentUploads, SessionRecords, StepFailure, StepId, StepRecord, Validation, WizardState,
};
use admit_store::{StepStore, StoreError};
use std::fmt;
use std::sync::Arc;

/// Collaborators injected into the controller
#[derive(Clone)]
pub struct WizardPorts {
    pub store: Arc<dyn StepStore>,
    pub uploads: Arc<dyn UploadClient>,
    pub submissions: Arc<dyn SubmissionClient>,
    pub catalog: Arc<dyn ProgramCatalog>,
}

/// Step 4 view: the persisted records plus display data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewSummary {
    /// Records as currently persisted
    pub records: SessionRecords,
    /// Title of the chosen program, if the catalog knows it
    pub program_title: Option<String>,
    /// First step that fails re-validation, if any
    pub incomplete: Option<StepFailure>,
}

impl ReviewSummary {
    /// Whether the application can be submitted as is
    #[inline]
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.incomplete.is_none()
    }
}

/// The wizard state machine
pub struct WizardController {
    store: Arc<dyn StepStore>,
    tracker: Arc<UploadTracker>,
    coordinator: SubmissionCoordinator,
    catalog: Arc<dyn ProgramCatalog>,
    state: WizardState,
    /// Transient edits of the current step 1 or 2 screen
    draft: Option<StepRecord>,
    /// Whether `draft` was edited since the screen was entered
    dirty: bool,
}

impl fmt::Debug for WizardController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WizardController")
            .field("state", &self.state)
            .field("draft", &self.draft)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

impl WizardController {
    /// Resume a session from storage
    ///
    /// Lands on the furthest reachable step, or on `requested` when that is
    /// earlier. A deep link past the reachable step is redirected
    /// immediately.
    pub async fn resume(ports: WizardPorts, requested: Option<StepId>) -> Result<Self, WizardError> {
        let tracker = UploadTracker::hydrate(Arc::clone(&ports.store), ports.uploads).await?;
        let mut controller = Self {
            coordinator: SubmissionCoordinator::new(Arc::clone(&ports.store), ports.submissions),
            store: ports.store,
            tracker,
            catalog: ports.catalog,
            state: WizardState::At(StepId::Personal),
            draft: None,
            dirty: false,
        };
        controller.enter(requested.unwrap_or(StepId::Review)).await?;
        Ok(controller)
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> WizardState {
        self.state
    }

    /// Current step, `None` once submitted
    #[inline]
    #[must_use]
    pub fn current_step(&self) -> Option<StepId> {
        self.state.step()
    }

    /// Transient record shown on the current step 1 or 2 screen
    #[inline]
    #[must_use]
    pub fn draft(&self) -> Option<&StepRecord> {
        self.draft.as_ref()
    }

    /// Current document states
    #[must_use]
    pub fn documents(&self) -> DocumentUploads {
        self.tracker.snapshot()
    }

    /// Upload tracker shared with in-flight transfers
    #[inline]
    #[must_use]
    pub fn tracker(&self) -> &Arc<UploadTracker> {
        &self.tracker
    }

    fn step_for(&self, action: &'static str) -> Result<StepId, WizardError> {
        self.state.step().ok_or(WizardError::InvalidTransition {
            from: self.state,
            action,
        })
    }

    /// Navigate to a step by direct entry (deep link or reload)
    ///
    /// Re-derives reachability from storage and lands on the requested step
    /// or, if it is not reachable, on the furthest reachable one.
    ///
    /// # Returns
    /// The step actually entered
    pub async fn enter(&mut self, requested: StepId) -> Result<StepId, WizardError> {
        self.step_for("enter")?;
        let records = self
            .store
            .load_session()
            .await
            .map_err(|e| WizardError::persistence(None, e))?;
        self.tracker.absorb(records.documents.as_ref());

        let mut reachable = furthest_reachable(&records);
        if reachable == StepId::Review && !self.tracker.in_flight().is_empty() {
            reachable = StepId::Documents;
        }
        let target = requested.min(reachable);
        if target != requested {
            tracing::info!(%requested, %target, "Redirecting to furthest reachable step");
        }
        self.land(target, records.record(target));
        Ok(target)
    }

    /// Replace the transient edits of the current screen
    ///
    /// # Errors
    /// - `WizardError::StepMismatch` if the record belongs to another step
    /// - `WizardError::InvalidTransition` on screens without a free-form
    ///   record (documents, review, submitted)
    pub fn update(&mut self, record: StepRecord) -> Result<(), WizardError> {
        let step = self.step_for("update")?;
        if record.step_id() != step {
            return Err(WizardError::StepMismatch {
                expected: step,
                actual: record.step_id(),
            });
        }
        if !matches!(step, StepId::Personal | StepId::Academic) {
            return Err(WizardError::InvalidTransition {
                from: self.state,
                action: "update",
            });
        }
        self.draft = Some(record);
        self.dirty = true;
        Ok(())
    }

    /// Validate and persist the current step, then move to the next one
    ///
    /// An invalid record leaves the state unchanged and writes nothing. A
    /// failed save leaves the state unchanged and is retryable.
    ///
    /// # Returns
    /// The step entered
    ///
    /// # Errors
    /// - `WizardError::UploadsOutstanding` when leaving the documents screen
    ///   with a transfer still running
    pub async fn advance(&mut self) -> Result<StepId, WizardError> {
        let step = self.step_for("advance")?;
        if step == StepId::Documents {
            self.ensure_no_transfers()?;
        }
        let next = step.next().ok_or(WizardError::InvalidTransition {
            from: self.state,
            action: "advance",
        })?;
        validate_transition(self.state, WizardState::At(next)).map_err(|_| {
            WizardError::InvalidTransition {
                from: self.state,
                action: "advance",
            }
        })?;

        let record = self
            .current_record(step)
            .ok_or(WizardError::InvalidTransition {
                from: self.state,
                action: "advance",
            })?;
        if let Validation::Invalid(errors) = validate(step, &record) {
            tracing::info!(%step, errors = errors.len(), "Advance blocked by validation");
            return Err(WizardError::Validation { step, errors });
        }

        if step == StepId::Documents {
            self.tracker.persist().await?;
        } else {
            self.store.save(&record).await.map_err(|e| {
                tracing::warn!(%step, error = %e, "Advance blocked: record not saved");
                WizardError::persistence(Some(step), e)
            })?;
        }

        let resumed = self.load_record(next).await;
        tracing::info!(from = %step, to = %next, resumed = resumed.is_some(), "Advanced");
        self.land(next, resumed);
        Ok(next)
    }

    /// Move to the previous step
    ///
    /// The current edits are saved on exit when they were changed; a failed
    /// save is logged and does not block navigation.
    pub async fn retreat(&mut self) -> Result<StepId, WizardError> {
        let step = self.step_for("retreat")?;
        let previous = step.previous().ok_or(WizardError::InvalidTransition {
            from: self.state,
            action: "retreat",
        })?;
        self.move_back(step, previous).await
    }

    /// Move back to any earlier step
    ///
    /// Same save-on-exit rule as [`Self::retreat`].
    pub async fn jump_back(&mut self, target: StepId) -> Result<StepId, WizardError> {
        let step = self.step_for("jump back")?;
        if !is_backward(step, target) {
            return Err(WizardError::InvalidTransition {
                from: self.state,
                action: "jump back",
            });
        }
        self.move_back(step, target).await
    }

    async fn move_back(&mut self, from: StepId, to: StepId) -> Result<StepId, WizardError> {
        validate_transition(self.state, WizardState::At(to)).map_err(|_| {
            WizardError::InvalidTransition {
                from: self.state,
                action: "retreat",
            }
        })?;
        self.save_on_exit(from).await;
        let record = self.load_record(to).await;
        tracing::info!(from = %from, to = %to, "Moved back");
        self.land(to, record);
        Ok(to)
    }

    /// Start uploading a document from the documents screen
    pub fn begin_upload(
        &mut self,
        kind: DocumentKind,
        file: UploadFile,
    ) -> Result<UploadHandle, WizardError> {
        if self.state != WizardState::At(StepId::Documents) {
            return Err(WizardError::InvalidTransition {
                from: self.state,
                action: "upload",
            });
        }
        self.tracker.begin_upload(kind, file)
    }

    /// Build the review view from the persisted records
    pub async fn review(&self) -> Result<ReviewSummary, WizardError> {
        self.step_for("review")?;
        let records = self
            .store
            .load_session()
            .await
            .map_err(|e| WizardError::persistence(None, e))?;

        let program_title = match records.personal.as_ref().map(|p| p.program.as_str()) {
            Some(id) if !id.trim().is_empty() => match self.catalog.get_program(id).await {
                Ok(program) => program.map(|p| p.title),
                Err(e) => {
                    tracing::warn!(program = %id, error = %e, "Program lookup failed");
                    None
                }
            },
            _ => None,
        };
        let incomplete = validate_review(&records).err();

        Ok(ReviewSummary {
            records,
            program_title,
            incomplete,
        })
    }

    /// Submit the application from the review step
    ///
    /// On success the session is purged and the state becomes `Submitted`.
    /// If a step no longer validates the controller lands on that step.
    /// Any other failure keeps the state and every record.
    ///
    /// # Errors
    /// - `WizardError::UploadsOutstanding` while a transfer is running; no
    ///   submission is attempted
    pub async fn submit(&mut self) -> Result<SubmissionReceipt, WizardError> {
        validate_transition(self.state, WizardState::Submitted).map_err(|_| {
            WizardError::InvalidTransition {
                from: self.state,
                action: "submit",
            }
        })?;
        self.ensure_no_transfers()?;

        match self.coordinator.submit().await {
            Ok(receipt) => {
                self.tracker.close().await;
                self.state = WizardState::Submitted;
                self.draft = None;
                self.dirty = false;
                Ok(receipt)
            }
            Err(WizardError::IncompleteApplication(step)) => {
                tracing::info!(%step, "Routing back to incomplete step");
                let record = self.load_record(step).await;
                self.land(step, record);
                Err(WizardError::IncompleteApplication(step))
            }
            Err(e) => Err(e),
        }
    }

    fn ensure_no_transfers(&self) -> Result<(), WizardError> {
        let kinds = self.tracker.in_flight();
        if kinds.is_empty() {
            return Ok(());
        }
        tracing::info!(outstanding = kinds.len(), "Waiting for uploads to finish");
        Err(WizardError::UploadsOutstanding { kinds })
    }

    fn current_record(&self, step: StepId) -> Option<StepRecord> {
        match step {
            StepId::Documents => Some(StepRecord::Documents(self.tracker.snapshot())),
            _ => self
                .draft
                .clone()
                .filter(|r| r.step_id() == step)
                .or_else(|| StepRecord::empty(step)),
        }
    }

    async fn save_on_exit(&self, step: StepId) {
        if !self.dirty {
            return;
        }
        if let Some(draft) = &self.draft {
            if let Err(e) = self.store.save(draft).await {
                tracing::warn!(%step, error = %e, "Save on exit failed");
            }
        }
    }

    async fn load_record(&self, step: StepId) -> Option<StepRecord> {
        match self.store.load(step).await {
            Ok(record) => record,
            Err(StoreError::Corrupt { .. }) => StepRecord::empty(step),
            Err(e) => {
                tracing::warn!(%step, error = %e, "Could not load step record, using defaults");
                None
            }
        }
    }

    fn land(&mut self, step: StepId, persisted: Option<StepRecord>) {
        self.state = WizardState::At(step);
        self.dirty = false;
        self.draft = match step {
            StepId::Personal | StepId::Academic => persisted.or_else(|| StepRecord::empty(step)),
            StepId::Documents | StepId::Review => None,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::ports::{MockSubmissionClient, MockUploadClient, StaticCatalog};
    use admit_core::{AcademicHistory, PersonalInfo, UploadState};
    use admit_store::{DurableStepStore, MemoryKv};

    fn ports(store: Arc<dyn StepStore>) -> WizardPorts {
        WizardPorts {
            store,
            uploads: Arc::new(MockUploadClient::new()),
            submissions: Arc::new(MockSubmissionClient::new()),
            catalog: Arc::new(StaticCatalog::default()),
        }
    }

    fn memory_store() -> Arc<dyn StepStore> {
        Arc::new(DurableStepStore::new(MemoryKv::new()))
    }

    fn personal() -> StepRecord {
        StepRecord::Personal(PersonalInfo {
            first_name: "Edsger".into(),
            last_name: "Dijkstra".into(),
            email: "ewd@example.edu".into(),
            date_of_birth: "1930-05-11".into(),
            program: "cs-phd".into(),
        })
    }

    fn academic() -> StepRecord {
        StepRecord::Academic(AcademicHistory {
            highest_qualification: "master".into(),
            institution_name: "Leiden".into(),
            field_of_study: "Physics".into(),
            graduation_date: "1956-01-01".into(),
            grade_gpa: "3.7".into(),
        })
    }

    #[tokio::test]
    async fn fresh_session_starts_at_personal_with_defaults() {
        let wizard = WizardController::resume(ports(memory_store()), None).await.unwrap();
        assert_eq!(wizard.state(), WizardState::At(StepId::Personal));
        assert_eq!(wizard.draft(), StepRecord::empty(StepId::Personal).as_ref());
    }

    #[tokio::test]
    async fn update_rejects_other_steps_record() {
        let mut wizard = WizardController::resume(ports(memory_store()), None).await.unwrap();
        let err = wizard.update(academic()).unwrap_err();
        assert!(matches!(
            err,
            WizardError::StepMismatch { expected: StepId::Personal, actual: StepId::Academic }
        ));
    }

    #[tokio::test]
    async fn advance_then_retreat_shows_saved_answers() {
        let store = memory_store();
        let mut wizard = WizardController::resume(ports(Arc::clone(&store)), None).await.unwrap();

        wizard.update(personal()).unwrap();
        assert_eq!(wizard.advance().await.unwrap(), StepId::Academic);
        assert_eq!(wizard.draft(), StepRecord::empty(StepId::Academic).as_ref());

        assert_eq!(wizard.retreat().await.unwrap(), StepId::Personal);
        assert_eq!(wizard.draft(), Some(&personal()));
        // untouched academic screen is not persisted on exit
        assert_eq!(store.load(StepId::Academic).await.unwrap(), None);
    }

    #[tokio::test]
    async fn retreat_saves_edited_draft() {
        let store = memory_store();
        store.save(&personal()).await.unwrap();
        let mut wizard = WizardController::resume(ports(Arc::clone(&store)), None).await.unwrap();
        assert_eq!(wizard.current_step(), Some(StepId::Academic));

        let partial = StepRecord::Academic(AcademicHistory {
            institution_name: "Delft".into(),
            ..AcademicHistory::default()
        });
        wizard.update(partial.clone()).unwrap();
        wizard.retreat().await.unwrap();

        assert_eq!(store.load(StepId::Academic).await.unwrap(), Some(partial));
    }

    #[tokio::test]
    async fn retreat_from_personal_is_undefined() {
        let mut wizard = WizardController::resume(ports(memory_store()), None).await.unwrap();
        assert!(matches!(
            wizard.retreat().await,
            Err(WizardError::InvalidTransition { action: "retreat", .. })
        ));
    }

    #[tokio::test]
    async fn jump_back_only_goes_backwards() {
        let store = memory_store();
        store.save(&personal()).await.unwrap();
        store.save(&academic()).await.unwrap();
        let mut wizard = WizardController::resume(ports(Arc::clone(&store)), None).await.unwrap();
        assert_eq!(wizard.current_step(), Some(StepId::Documents));

        assert!(wizard.jump_back(StepId::Review).await.is_err());
        assert!(wizard.jump_back(StepId::Documents).await.is_err());
        assert_eq!(wizard.jump_back(StepId::Personal).await.unwrap(), StepId::Personal);
        assert_eq!(wizard.draft(), Some(&personal()));
    }

    #[tokio::test]
    async fn enter_clamps_to_reachable() {
        let store = memory_store();
        store.save(&personal()).await.unwrap();
        store.save(&academic()).await.unwrap();
        let mut wizard = WizardController::resume(ports(Arc::clone(&store)), Some(StepId::Personal))
            .await
            .unwrap();
        assert_eq!(wizard.current_step(), Some(StepId::Personal));

        assert_eq!(wizard.enter(StepId::Review).await.unwrap(), StepId::Documents);
        assert_eq!(wizard.enter(StepId::Academic).await.unwrap(), StepId::Academic);
        assert_eq!(wizard.draft(), Some(&academic()));
    }

    #[tokio::test]
    async fn advance_from_documents_requires_every_upload() {
        let store = memory_store();
        store.save(&personal()).await.unwrap();
        store.save(&academic()).await.unwrap();
        let docs = DocumentUploads::new()
            .with(DocumentKind::RequiredDocs, UploadState::Done("https://cdn/id".into()));
        store.save(&StepRecord::Documents(docs)).await.unwrap();
        let mut wizard = WizardController::resume(ports(store), None).await.unwrap();

        let err = wizard.advance().await.unwrap_err();
        assert_eq!(err.field_errors().len(), 3);
        assert_eq!(wizard.current_step(), Some(StepId::Documents));
    }

    #[tokio::test]
    async fn upload_only_from_documents_screen() {
        let mut wizard = WizardController::resume(ports(memory_store()), None).await.unwrap();
        let err = wizard
            .begin_upload(
                DocumentKind::Transcripts,
                UploadFile::new("t.pdf", "application/pdf", vec![1]),
            )
            .unwrap_err();
        assert!(matches!(err, WizardError::InvalidTransition { action: "upload", .. }));
    }

    #[tokio::test]
    async fn submit_only_from_review() {
        let mut wizard = WizardController::resume(ports(memory_store()), None).await.unwrap();
        assert!(matches!(
            wizard.submit().await,
            Err(WizardError::InvalidTransition { action: "submit", .. })
        ));
    }

    #[tokio::test]
    async fn review_resolves_program_title() {
        let store = memory_store();
        store.save(&personal()).await.unwrap();
        let mut ports = ports(Arc::clone(&store));
        ports.catalog = Arc::new(StaticCatalog::new([crate::ports::Program {
            id: "cs-phd".into(),
            title: "PhD Computer Science".into(),
            department: Some("Informatics".into()),
        }]));
        let wizard = WizardController::resume(ports, None).await.unwrap();

        let summary = wizard.review().await.unwrap();
        assert_eq!(summary.program_title.as_deref(), Some("PhD Computer Science"));
        assert!(!summary.is_ready());
        assert_eq!(summary.incomplete.map(|f| f.step), Some(StepId::Academic));
    }

    #[tokio::test]
    async fn failed_submit_stays_on_review() {
        let store = memory_store();
        store.save(&personal()).await.unwrap();
        store.save(&academic()).await.unwrap();
        let docs = DocumentKind::ALL.into_iter().fold(DocumentUploads::new(), |acc, kind| {
            acc.with(kind, UploadState::Done(format!("https://cdn/{kind}")))
        });
        store.save(&StepRecord::Documents(docs)).await.unwrap();

        let mut submissions = MockSubmissionClient::new();
        submissions
            .expect_submit_application()
            .times(1)
            .returning(|_, _| Err(CollaboratorError::Timeout));
        let mut ports = ports(Arc::clone(&store));
        ports.submissions = Arc::new(submissions);

        let mut wizard = WizardController::resume(ports, None).await.unwrap();
        assert_eq!(wizard.current_step(), Some(StepId::Review));

        let err = wizard.submit().await.unwrap_err();
        assert!(matches!(err, WizardError::SubmissionFailed(CollaboratorError::Timeout)));
        assert_eq!(wizard.state(), WizardState::At(StepId::Review));
        assert!(store.load(StepId::Personal).await.unwrap().is_some());
    }
}
