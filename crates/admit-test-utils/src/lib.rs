//! Testing utilities for the admission wizard workspace
//!
//! Shared fixtures, a fault-injecting key-value medium and scripted fakes of
//! the upload and submission services.

#![allow(missing_docs)]

use admit_core::{
    AcademicHistory, ApplicationPayload, DocumentKind, DocumentUploads, PersonalInfo, StepRecord,
    UploadState,
};
use admit_flow::{
    CollaboratorError, Program, StaticCatalog, SubmissionAck, SubmissionClient, UploadClient,
    UploadFile, WizardPorts,
};
use admit_store::{DurableStepStore, KvError, KvPort, MemoryKv, StepStore};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

// ----------------------------------------------------------------------------
// Fixtures
// ----------------------------------------------------------------------------

pub const PROGRAM_ID: &str = "cs-msc";

pub fn valid_personal() -> PersonalInfo {
    PersonalInfo {
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.edu".into(),
        date_of_birth: "1815-12-10".into(),
        program: PROGRAM_ID.into(),
    }
}

pub fn valid_academic() -> AcademicHistory {
    AcademicHistory {
        highest_qualification: "bachelor".into(),
        institution_name: "University of London".into(),
        field_of_study: "Mathematics".into(),
        graduation_date: "1835-06-30".into(),
        grade_gpa: "3.9".into(),
    }
}

pub fn document_uri(kind: DocumentKind) -> String {
    format!("https://files.example.edu/{kind}")
}

pub fn all_documents_done() -> DocumentUploads {
    DocumentKind::ALL.into_iter().fold(DocumentUploads::new(), |docs, kind| {
        docs.with(kind, UploadState::Done(document_uri(kind)))
    })
}

pub fn pdf(name: &str) -> UploadFile {
    UploadFile::new(name, "application/pdf", b"%PDF-1.7\n%test".to_vec())
}

pub fn catalog() -> StaticCatalog {
    StaticCatalog::new([Program {
        id: PROGRAM_ID.into(),
        title: "MSc Computer Science".into(),
        department: Some("Informatics".into()),
    }])
}

pub fn memory_store() -> Arc<dyn StepStore> {
    Arc::new(DurableStepStore::new(MemoryKv::new()))
}

/// Persist valid records for steps 1..3
pub async fn seed_complete(store: &dyn StepStore) {
    let records = [
        StepRecord::Personal(valid_personal()),
        StepRecord::Academic(valid_academic()),
        StepRecord::Documents(all_documents_done()),
    ];
    for record in &records {
        store.save(record).await.unwrap();
    }
}

pub fn ports(
    store: Arc<dyn StepStore>,
    uploads: Arc<FakeUploadClient>,
    submissions: Arc<FakeSubmissionClient>,
) -> WizardPorts {
    WizardPorts {
        store,
        uploads,
        submissions,
        catalog: Arc::new(catalog()),
    }
}

// ----------------------------------------------------------------------------
// Fault-injecting medium
// ----------------------------------------------------------------------------

/// In-memory medium that can be made to refuse writes or reads
#[derive(Debug, Default)]
pub struct FaultyKv {
    inner: MemoryKv,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    sets: AtomicUsize,
    removes: AtomicUsize,
}

impl FaultyKv {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Successful `set` calls so far
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Successful `remove` calls so far
    pub fn removes(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemoryKv {
        &self.inner
    }

    /// Step store over this medium
    pub fn store(self: &Arc<Self>) -> Arc<dyn StepStore> {
        Arc::new(DurableStepStore::new(Arc::clone(self)))
    }
}

#[async_trait::async_trait]
impl KvPort for FaultyKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("injected read failure".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("injected write failure".into()));
        }
        self.inner.set(key, value).await?;
        self.sets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("injected remove failure".into()));
        }
        self.inner.remove(key).await?;
        self.removes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Upload service fake
// ----------------------------------------------------------------------------

/// Upload service answering from a script keyed by file name
///
/// Files without a scripted failure succeed with a URL derived from the
/// name. A gated client holds every transfer until [`Self::release`].
#[derive(Debug, Default)]
pub struct FakeUploadClient {
    failures: Mutex<HashMap<String, CollaboratorError>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Semaphore>,
}

impl FakeUploadClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Client whose transfers wait for [`Self::release`]
    pub fn gated() -> Arc<Self> {
        Arc::new(Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        })
    }

    /// Fail every upload of `name` with `error`
    pub fn fail_file(&self, name: &str, error: CollaboratorError) {
        self.failures.lock().insert(name.to_string(), error);
    }

    /// Stop failing uploads of `name`
    pub fn heal_file(&self, name: &str) {
        self.failures.lock().remove(name);
    }

    /// Let `n` held transfers finish
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    /// File names received so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn url_for(name: &str) -> String {
        format!("https://files.example.edu/uploads/{name}")
    }
}

#[async_trait::async_trait]
impl UploadClient for FakeUploadClient {
    async fn upload(&self, file: UploadFile) -> Result<String, CollaboratorError> {
        self.calls.lock().push(file.name.clone());
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| CollaboratorError::Transport(e.to_string()))?
                .forget();
        }
        let failure = self.failures.lock().get(&file.name).cloned();
        match failure {
            Some(error) => Err(error),
            None => Ok(Self::url_for(&file.name)),
        }
    }
}

// ----------------------------------------------------------------------------
// Submission service fake
// ----------------------------------------------------------------------------

/// One recorded submission call
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionCall {
    pub payload: ApplicationPayload,
    pub fingerprint: String,
}

/// Submission service with scripted outcomes
///
/// Queued outcomes are consumed in order; once the queue is empty every call
/// succeeds with reference `APP-<n>`.
#[derive(Debug, Default)]
pub struct FakeSubmissionClient {
    script: Mutex<VecDeque<Result<String, CollaboratorError>>>,
    calls: Mutex<Vec<SubmissionCall>>,
}

impl FakeSubmissionClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a failure for the next call
    pub fn fail_next(&self, error: CollaboratorError) {
        self.script.lock().push_back(Err(error));
    }

    /// Queue a success with a given reference for the next call
    pub fn accept_next(&self, reference: &str) {
        self.script.lock().push_back(Ok(reference.to_string()));
    }

    pub fn calls(&self) -> Vec<SubmissionCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait::async_trait]
impl SubmissionClient for FakeSubmissionClient {
    async fn submit_application(
        &self,
        payload: &ApplicationPayload,
        fingerprint: &str,
    ) -> Result<SubmissionAck, CollaboratorError> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push(SubmissionCall {
                payload: payload.clone(),
                fingerprint: fingerprint.to_string(),
            });
            calls.len()
        };
        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("APP-{n}")));
        outcome.map(|reference| SubmissionAck { reference })
    }
}
