use admit_core::{DocumentKind, StepId, StepRecord, UploadState, WizardState};
use admit_flow::{CollaboratorError, WizardController, WizardError};
use admit_store::StepStore;
use admit_test_utils::{
    all_documents_done, ports, seed_complete, valid_personal, FakeSubmissionClient,
    FakeUploadClient, FaultyKv,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

struct Harness {
    kv: Arc<FaultyKv>,
    store: Arc<dyn StepStore>,
    submissions: Arc<FakeSubmissionClient>,
    wizard: WizardController,
}

async fn at_review() -> Harness {
    let kv = FaultyKv::new();
    let store = kv.store();
    seed_complete(store.as_ref()).await;
    let submissions = FakeSubmissionClient::new();
    let ports = ports(Arc::clone(&store), FakeUploadClient::new(), Arc::clone(&submissions));
    let wizard = WizardController::resume(ports, None).await.unwrap();
    assert_eq!(wizard.current_step(), Some(StepId::Review));
    Harness {
        kv,
        store,
        submissions,
        wizard,
    }
}

#[tokio::test]
async fn failed_submission_purges_nothing() {
    let mut h = at_review().await;
    let before = h.store.load_session().await.unwrap();
    h.submissions.fail_next(CollaboratorError::Rejected {
        status: 502,
        message: "bad gateway".into(),
    });

    let err = h.wizard.submit().await.unwrap_err();

    assert!(matches!(err, WizardError::SubmissionFailed(_)));
    assert!(err.is_retryable());
    assert_eq!(h.wizard.state(), WizardState::At(StepId::Review));
    assert_eq!(h.kv.removes(), 0);
    assert_eq!(h.store.load_session().await.unwrap(), before);
}

#[tokio::test]
async fn retry_after_failure_sends_identical_payload() {
    let mut h = at_review().await;
    h.submissions.fail_next(CollaboratorError::Timeout);
    h.submissions.accept_next("APP-2026-0042");

    h.wizard.submit().await.unwrap_err();
    let receipt = h.wizard.submit().await.unwrap();
    assert_eq!(receipt.reference, "APP-2026-0042");

    let calls = h.submissions.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].payload, calls[1].payload);
    assert_eq!(calls[0].fingerprint, calls[1].fingerprint);
    assert_eq!(receipt.fingerprint, calls[1].fingerprint);
    assert_eq!(h.kv.removes(), 3);
}

#[tokio::test]
async fn record_invalidated_elsewhere_routes_back() {
    let mut h = at_review().await;
    // another tab removed a document after this one reached review
    let docs = all_documents_done().with(DocumentKind::Transcripts, UploadState::Pending);
    h.store.save(&StepRecord::Documents(docs)).await.unwrap();

    let err = h.wizard.submit().await.unwrap_err();

    assert!(matches!(err, WizardError::IncompleteApplication(StepId::Documents)));
    assert_eq!(err.redirect_to(), Some(StepId::Documents));
    assert_eq!(h.wizard.current_step(), Some(StepId::Documents));
    assert_eq!(h.submissions.call_count(), 0);
    assert_eq!(h.kv.removes(), 0);
}

#[tokio::test]
async fn invalid_personal_record_routes_to_step_one() {
    let mut h = at_review().await;
    let mut personal = valid_personal();
    personal.email = "not-an-address".into();
    h.store.save(&StepRecord::Personal(personal.clone())).await.unwrap();

    let err = h.wizard.submit().await.unwrap_err();

    assert_eq!(err.redirect_to(), Some(StepId::Personal));
    assert_eq!(h.wizard.draft(), Some(&StepRecord::Personal(personal)));
}

#[tokio::test]
async fn purge_failure_after_acceptance_still_submits() {
    let mut h = at_review().await;
    h.kv.fail_writes(true);

    let receipt = h.wizard.submit().await.unwrap();

    assert!(!receipt.purged);
    assert_eq!(h.wizard.state(), WizardState::Submitted);
    assert_eq!(h.submissions.call_count(), 1);
}

#[tokio::test]
async fn unreadable_storage_blocks_submission() {
    let mut h = at_review().await;
    h.kv.fail_reads(true);

    let err = h.wizard.submit().await.unwrap_err();

    assert!(matches!(err, WizardError::PersistenceUnavailable { step: None, .. }));
    assert_eq!(h.wizard.state(), WizardState::At(StepId::Review));
    assert_eq!(h.submissions.call_count(), 0);
}
