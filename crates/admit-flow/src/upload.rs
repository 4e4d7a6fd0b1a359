//! Upload tracker
//!
//! Per-document upload state driven by the external upload service.
//!
//! Every completed transfer is persisted as the step 3 record immediately,
//! so a reload never loses a finished upload. Transfers run as detached
//! tasks: leaving the documents screen does not cancel them, and a late
//! completion still lands in storage (last completed wins). All step 3
//! writes go through one lock, so they are issued serially.
//!
//! Only settled states are written. A kind with a transfer in flight is
//! persisted as whatever it was before the transfer started, so a pending
//! re-upload never hides the document it replaces.

use crate::error::WizardError;
use crate::ports::{UploadClient, UploadFile};
use admit_core::{DocumentKind, DocumentUploads, StepId, StepRecord, UploadState};
use admit_store::{StepStore, StoreError};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug)]
struct Slots {
    /// What the documents screen shows, transfers in flight included
    live: DocumentUploads,
    /// Last settled state of every kind; never `Uploading`
    settled: DocumentUploads,
}

/// Tracks the upload state of each document kind
pub struct UploadTracker {
    store: Arc<dyn StepStore>,
    client: Arc<dyn UploadClient>,
    slots: Mutex<Slots>,
    write_lock: tokio::sync::Mutex<()>,
    /// Set once the application is submitted; later completions stay in memory
    closed: AtomicBool,
}

impl fmt::Debug for UploadTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadTracker")
            .field("documents", &self.slots.lock().live)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Handle to one in-flight transfer
///
/// Dropping the handle does not cancel the transfer.
#[derive(Debug)]
pub struct UploadHandle {
    kind: DocumentKind,
    task: JoinHandle<Result<String, WizardError>>,
}

impl UploadHandle {
    /// Document kind being uploaded
    #[inline]
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Wait for the transfer and its persistence
    ///
    /// Returns the content URL on success.
    pub async fn wait(self) -> Result<String, WizardError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(WizardError::UploadFailed {
                kind: self.kind,
                reason: e.to_string(),
            }),
        }
    }
}

impl UploadTracker {
    /// Create tracker with every kind pending
    #[must_use]
    pub fn new(store: Arc<dyn StepStore>, client: Arc<dyn UploadClient>) -> Arc<Self> {
        Self::with_documents(store, client, DocumentUploads::new())
    }

    /// Create tracker from known document states
    #[must_use]
    pub fn with_documents(
        store: Arc<dyn StepStore>,
        client: Arc<dyn UploadClient>,
        documents: DocumentUploads,
    ) -> Arc<Self> {
        let settled = documents.normalized();
        Arc::new(Self {
            store,
            client,
            slots: Mutex::new(Slots {
                live: settled.clone(),
                settled,
            }),
            write_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        })
    }

    /// Create tracker from the persisted step 3 record
    ///
    /// A corrupt record starts over with every kind pending.
    pub async fn hydrate(
        store: Arc<dyn StepStore>,
        client: Arc<dyn UploadClient>,
    ) -> Result<Arc<Self>, WizardError> {
        let documents = match store.load(StepId::Documents).await {
            Ok(Some(StepRecord::Documents(docs))) => docs,
            Ok(_) => DocumentUploads::new(),
            Err(StoreError::Corrupt { source, .. }) => {
                tracing::warn!(error = %source, "Corrupt documents record, starting over");
                DocumentUploads::new()
            }
            Err(e) => return Err(WizardError::persistence(Some(StepId::Documents), e)),
        };
        Ok(Self::with_documents(store, client, documents))
    }

    /// Current document states, transfers in flight shown as `Uploading`
    #[must_use]
    pub fn snapshot(&self) -> DocumentUploads {
        self.slots.lock().live.clone()
    }

    /// Document states as they are persisted
    #[must_use]
    pub fn settled(&self) -> DocumentUploads {
        self.slots.lock().settled.clone()
    }

    /// State of one kind
    #[must_use]
    pub fn state(&self, kind: DocumentKind) -> UploadState {
        self.slots.lock().live.state(kind).clone()
    }

    /// Kinds not yet uploaded
    #[must_use]
    pub fn pending_kinds(&self) -> Vec<DocumentKind> {
        self.slots.lock().live.pending_kinds()
    }

    /// Kinds with a transfer outstanding
    #[must_use]
    pub fn in_flight(&self) -> Vec<DocumentKind> {
        self.slots
            .lock()
            .live
            .iter()
            .filter(|(_, state)| **state == UploadState::Uploading)
            .map(|(kind, _)| kind)
            .collect()
    }

    /// Whether the session was submitted and storage is off limits
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop writing to the store
    ///
    /// Waits for a write already underway. Transfers finishing afterwards
    /// still update the in-memory states.
    pub async fn close(&self) {
        let _guard = self.write_lock.lock().await;
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Merge a freshly loaded step 3 record
    ///
    /// Kinds with a transfer in flight keep showing `Uploading`; every other
    /// kind takes the persisted state. Used when the session is re-derived
    /// from storage, which another tab may have written.
    pub fn absorb(&self, persisted: Option<&DocumentUploads>) {
        let persisted = persisted.map_or_else(DocumentUploads::new, DocumentUploads::normalized);
        let mut slots = self.slots.lock();
        for (kind, state) in persisted.iter() {
            if *slots.live.state(kind) != UploadState::Uploading {
                slots.live.set(kind, state.clone());
            }
            slots.settled.set(kind, state.clone());
        }
    }

    /// Start uploading a document
    ///
    /// Sets the kind to `Uploading` and spawns the transfer. On success the
    /// kind becomes `Done(uri)` and the step 3 record is persisted; on
    /// failure the kind reverts to its settled state (`Pending`, or the
    /// previous URI for a re-upload) and only that kind reports an error.
    ///
    /// # Errors
    /// - `WizardError::UploadInProgress` if this kind already has a transfer
    ///   outstanding
    pub fn begin_upload(
        self: &Arc<Self>,
        kind: DocumentKind,
        file: UploadFile,
    ) -> Result<UploadHandle, WizardError> {
        {
            let mut slots = self.slots.lock();
            if *slots.live.state(kind) == UploadState::Uploading {
                return Err(WizardError::UploadInProgress(kind));
            }
            slots.live.set(kind, UploadState::Uploading);
        }
        tracing::info!(%kind, file = %file.name, bytes = file.bytes.len(), "Upload started");

        let tracker = Arc::clone(self);
        let task = tokio::spawn(async move { tracker.transfer(kind, file).await });
        Ok(UploadHandle { kind, task })
    }

    async fn transfer(&self, kind: DocumentKind, file: UploadFile) -> Result<String, WizardError> {
        match self.client.upload(file).await {
            Ok(uri) => {
                let _guard = self.write_lock.lock().await;
                let record = {
                    let mut slots = self.slots.lock();
                    slots.settled.set(kind, UploadState::Done(uri.clone()));
                    slots.settled.clone()
                };
                tracing::info!(%kind, uri = %uri, "Upload completed");

                // the kind shows Uploading until its record is written
                let saved = if self.is_closed() {
                    tracing::debug!(%kind, "Session already submitted, not persisting");
                    Ok(())
                } else {
                    self.store.save(&StepRecord::Documents(record)).await
                };
                self.slots.lock().live.set(kind, UploadState::Done(uri.clone()));
                saved.map_err(|e| {
                    tracing::warn!(%kind, error = %e, "Completed upload not persisted");
                    WizardError::persistence(Some(StepId::Documents), e)
                })?;
                Ok(uri)
            }
            Err(e) => {
                {
                    let mut slots = self.slots.lock();
                    let restored = slots.settled.state(kind).clone();
                    slots.live.set(kind, restored);
                }
                tracing::warn!(%kind, error = %e, "Upload failed");
                Err(WizardError::UploadFailed {
                    kind,
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Persist the settled document states as the step 3 record
    pub async fn persist(&self) -> Result<(), WizardError> {
        let _guard = self.write_lock.lock().await;
        if self.is_closed() {
            return Ok(());
        }
        self.store
            .save(&StepRecord::Documents(self.settled()))
            .await
            .map_err(|e| WizardError::persistence(Some(StepId::Documents), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollaboratorError;
    use crate::ports::MockUploadClient;
    use admit_store::{DurableStepStore, MemoryKv};

    fn file(name: &str) -> UploadFile {
        UploadFile::new(name, "application/pdf", b"%PDF-1.7".to_vec())
    }

    fn store() -> Arc<dyn StepStore> {
        Arc::new(DurableStepStore::new(MemoryKv::new()))
    }

    #[tokio::test]
    async fn successful_upload_is_persisted_immediately() {
        let mut client = MockUploadClient::new();
        client
            .expect_upload()
            .times(1)
            .returning(|f| Ok(format!("https://cdn/{}", f.name)));
        let store = store();
        let tracker = UploadTracker::new(Arc::clone(&store), Arc::new(client));

        let uri = tracker
            .begin_upload(DocumentKind::Transcripts, file("t.pdf"))
            .unwrap()
            .wait()
            .await
            .unwrap();

        assert_eq!(uri, "https://cdn/t.pdf");
        assert_eq!(tracker.state(DocumentKind::Transcripts), UploadState::Done(uri.clone()));
        let Some(StepRecord::Documents(saved)) = store.load(StepId::Documents).await.unwrap()
        else {
            panic!("documents record not persisted");
        };
        assert_eq!(saved.state(DocumentKind::Transcripts).uri(), Some(uri.as_str()));
    }

    #[tokio::test]
    async fn failed_upload_reverts_only_that_kind() {
        let mut client = MockUploadClient::new();
        client
            .expect_upload()
            .returning(|_| Err(CollaboratorError::Timeout));
        let docs = DocumentUploads::new()
            .with(DocumentKind::RequiredDocs, UploadState::Done("https://cdn/id".into()));
        let tracker = UploadTracker::with_documents(store(), Arc::new(client), docs);

        let err = tracker
            .begin_upload(DocumentKind::RecommendationLetters, file("letters.pdf"))
            .unwrap()
            .wait()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WizardError::UploadFailed { kind: DocumentKind::RecommendationLetters, .. }
        ));
        assert_eq!(tracker.state(DocumentKind::RecommendationLetters), UploadState::Pending);
        assert!(tracker.state(DocumentKind::RequiredDocs).is_done());
    }

    #[tokio::test]
    async fn failed_reupload_keeps_previous_uri() {
        let mut client = MockUploadClient::new();
        client
            .expect_upload()
            .returning(|_| Err(CollaboratorError::Transport("reset".into())));
        let docs = DocumentUploads::new()
            .with(DocumentKind::PersonalEssay, UploadState::Done("https://cdn/v1".into()));
        let tracker = UploadTracker::with_documents(store(), Arc::new(client), docs);

        let _ = tracker
            .begin_upload(DocumentKind::PersonalEssay, file("essay.pdf"))
            .unwrap()
            .wait()
            .await;

        assert_eq!(
            tracker.state(DocumentKind::PersonalEssay),
            UploadState::Done("https://cdn/v1".into())
        );
    }

    #[tokio::test]
    async fn second_transfer_for_same_kind_is_rejected() {
        let mut client = MockUploadClient::new();
        client
            .expect_upload()
            .times(1)
            .returning(|_| Ok("https://cdn/first".into()));
        let tracker = UploadTracker::new(store(), Arc::new(client));

        // the spawned transfer cannot run before this task yields
        let first = tracker
            .begin_upload(DocumentKind::Transcripts, file("a.pdf"))
            .unwrap();
        let second = tracker.begin_upload(DocumentKind::Transcripts, file("b.pdf"));
        assert!(matches!(
            second,
            Err(WizardError::UploadInProgress(DocumentKind::Transcripts))
        ));

        assert_eq!(first.wait().await.unwrap(), "https://cdn/first");
        assert!(tracker.begin_upload(DocumentKind::Transcripts, file("c.pdf")).is_ok());
    }

    #[tokio::test]
    async fn hydrate_resets_stale_in_flight_states() {
        let store = store();
        let docs = DocumentUploads::new()
            .with(DocumentKind::Transcripts, UploadState::Uploading)
            .with(DocumentKind::RequiredDocs, UploadState::Done("https://cdn/id".into()));
        store.save(&StepRecord::Documents(docs)).await.unwrap();

        let tracker = UploadTracker::hydrate(store, Arc::new(MockUploadClient::new()))
            .await
            .unwrap();

        assert_eq!(tracker.state(DocumentKind::Transcripts), UploadState::Pending);
        assert!(tracker.state(DocumentKind::RequiredDocs).is_done());
    }

    #[tokio::test]
    async fn absorb_keeps_in_flight_kinds() {
        let docs = DocumentUploads::new().with(DocumentKind::Transcripts, UploadState::Uploading);
        let tracker = UploadTracker::with_documents(store(), Arc::new(MockUploadClient::new()), docs);
        // with_documents normalizes, so mark in flight again
        tracker.slots.lock().live.set(DocumentKind::Transcripts, UploadState::Uploading);

        let persisted = DocumentUploads::new()
            .with(DocumentKind::Transcripts, UploadState::Done("https://cdn/other-tab".into()))
            .with(DocumentKind::PersonalEssay, UploadState::Done("https://cdn/essay".into()));
        tracker.absorb(Some(&persisted));

        assert_eq!(tracker.state(DocumentKind::Transcripts), UploadState::Uploading);
        assert_eq!(
            tracker.settled().state(DocumentKind::Transcripts),
            &UploadState::Done("https://cdn/other-tab".into())
        );
        assert!(tracker.state(DocumentKind::PersonalEssay).is_done());
    }

    #[tokio::test]
    async fn persist_writes_settled_state_of_in_flight_kinds() {
        let store = store();
        let docs = DocumentUploads::new()
            .with(DocumentKind::Transcripts, UploadState::Done("https://cdn/v1".into()));
        let tracker =
            UploadTracker::with_documents(Arc::clone(&store), Arc::new(MockUploadClient::new()), docs);
        tracker.slots.lock().live.set(DocumentKind::Transcripts, UploadState::Uploading);
        tracker.slots.lock().live.set(DocumentKind::PersonalEssay, UploadState::Uploading);

        tracker.persist().await.unwrap();

        let Some(StepRecord::Documents(saved)) = store.load(StepId::Documents).await.unwrap()
        else {
            panic!("documents record not persisted");
        };
        assert_eq!(
            saved.state(DocumentKind::Transcripts),
            &UploadState::Done("https://cdn/v1".into())
        );
        assert_eq!(saved.state(DocumentKind::PersonalEssay), &UploadState::Pending);
        assert_eq!(
            tracker.in_flight(),
            vec![DocumentKind::Transcripts, DocumentKind::PersonalEssay]
        );
    }

    #[tokio::test]
    async fn closed_tracker_keeps_completions_in_memory() {
        let mut client = MockUploadClient::new();
        client
            .expect_upload()
            .returning(|_| Ok("https://cdn/late".into()));
        let store = store();
        let tracker = UploadTracker::new(Arc::clone(&store), Arc::new(client));
        tracker.close().await;

        tracker
            .begin_upload(DocumentKind::Transcripts, file("t.pdf"))
            .unwrap()
            .wait()
            .await
            .unwrap();
        tracker.persist().await.unwrap();

        assert!(tracker.state(DocumentKind::Transcripts).is_done());
        assert_eq!(store.load(StepId::Documents).await.unwrap(), None);
    }
}
