//! Subcommands

use admit_core::{
    AcademicHistory, ApplicationPayload, DocumentKind, PersonalInfo, StepId, StepRecord,
    UploadState, WizardState,
};
use admit_flow::{
    CollaboratorError, SubmissionAck, SubmissionClient, UploadClient, UploadFile, WizardConfig,
    WizardController, WizardError, WizardPorts,
};
use admit_http::{HttpSubmissionClient, HttpUploadClient};
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Show the step the session resumes at
    Status,
    /// Fill step 1 or 2 from a JSON file and advance
    Fill {
        /// Step number or name
        step: StepId,
        /// JSON record
        file: PathBuf,
    },
    /// Go back one step from where the session resumes
    ///
    /// The current step is not kept between invocations: every run resumes
    /// at the furthest reachable step, so repeating `back` does not walk
    /// further back. Use `jump` to reach an earlier step.
    Back,
    /// Navigate to a step (redirected if not reachable yet)
    Jump {
        /// Step number or name
        step: StepId,
    },
    /// Upload one document from step 3
    Upload {
        /// Document kind, e.g. `transcripts` or `personal-essay`
        kind: DocumentKind,
        /// File to upload
        path: PathBuf,
    },
    /// Show the review summary
    Review,
    /// Submit the application
    Submit,
}

/// Stand-in for a collaborator whose endpoint is not configured
#[derive(Debug)]
struct Unconfigured(&'static str);

impl Unconfigured {
    fn error(&self) -> CollaboratorError {
        CollaboratorError::Transport(format!("{} is not configured", self.0))
    }
}

#[async_trait::async_trait]
impl UploadClient for Unconfigured {
    async fn upload(&self, _file: UploadFile) -> Result<String, CollaboratorError> {
        Err(self.error())
    }
}

#[async_trait::async_trait]
impl SubmissionClient for Unconfigured {
    async fn submit_application(
        &self,
        _payload: &ApplicationPayload,
        _fingerprint: &str,
    ) -> Result<SubmissionAck, CollaboratorError> {
        Err(self.error())
    }
}

pub(crate) fn build_ports(config: &WizardConfig) -> Result<WizardPorts> {
    let timeout = config.request_timeout();
    let uploads: Arc<dyn UploadClient> = match &config.upload.endpoint {
        Some(endpoint) => Arc::new(HttpUploadClient::new(endpoint.clone(), timeout)?),
        None => Arc::new(Unconfigured("upload.endpoint")),
    };
    let submissions: Arc<dyn SubmissionClient> = match &config.submission.endpoint {
        Some(endpoint) => Arc::new(HttpSubmissionClient::new(endpoint.clone(), timeout)?),
        None => Arc::new(Unconfigured("submission.endpoint")),
    };
    Ok(WizardPorts {
        store: config.build_store()?,
        uploads,
        submissions,
        catalog: Arc::new(config.catalog()),
    })
}

pub(crate) async fn execute(command: Command, ports: WizardPorts) -> Result<String> {
    match command {
        Command::Status => {
            let wizard = WizardController::resume(ports, None).await?;
            Ok(render(&wizard))
        }
        Command::Fill { step, file } => {
            let record = read_record(step, &file).await?;
            let mut wizard = WizardController::resume(ports, Some(step)).await?;
            if wizard.current_step() != Some(step) {
                bail!("{step} is not reachable yet; continue at {}", wizard.state());
            }
            wizard.update(record)?;
            let outcome = wizard.advance().await;
            finish(&wizard, outcome.map(|_| ()))
        }
        Command::Back => {
            let mut wizard = WizardController::resume(ports, None).await?;
            let outcome = wizard.retreat().await;
            finish(&wizard, outcome.map(|_| ()))
        }
        Command::Jump { step } => {
            let wizard = WizardController::resume(ports, Some(step)).await?;
            let landed = wizard.current_step();
            let mut report = render(&wizard);
            if landed != Some(step) {
                let _ = write!(report, "\nredirected: {step} is not reachable yet");
            }
            Ok(report)
        }
        Command::Upload { kind, path } => {
            let file = read_upload(&path).await?;
            let mut wizard = WizardController::resume(ports, Some(StepId::Documents)).await?;
            if wizard.current_step() != Some(StepId::Documents) {
                bail!("documents are not reachable yet; continue at {}", wizard.state());
            }
            let outcome = match wizard.begin_upload(kind, file) {
                Ok(handle) => handle.wait().await.map(|_| ()),
                Err(e) => Err(e),
            };
            finish(&wizard, outcome)
        }
        Command::Review => {
            let wizard = WizardController::resume(ports, Some(StepId::Review)).await?;
            let summary = wizard.review().await?;
            let mut report = render(&wizard);
            let personal = summary.records.personal.unwrap_or_default();
            let _ = write!(
                report,
                "\napplicant: {} {} <{}>\nprogram: {}",
                personal.first_name,
                personal.last_name,
                personal.email,
                summary.program_title.as_deref().unwrap_or(&personal.program),
            );
            if let Some(academic) = summary.records.academic {
                let _ = write!(
                    report,
                    "\neducation: {} in {} ({})",
                    academic.highest_qualification,
                    academic.field_of_study,
                    academic.institution_name
                );
            }
            match summary.incomplete {
                None => report.push_str("\nready to submit"),
                Some(failure) => {
                    let _ = write!(report, "\nincomplete: {}", failure.step);
                }
            }
            Ok(report)
        }
        Command::Submit => {
            let mut wizard = WizardController::resume(ports, Some(StepId::Review)).await?;
            if wizard.current_step() != Some(StepId::Review) {
                bail!("application incomplete; continue at {}", wizard.state());
            }
            match wizard.submit().await {
                Ok(receipt) => {
                    let mut report = render(&wizard);
                    let _ = write!(
                        report,
                        "\nreference: {}\nsubmitted at: {}",
                        receipt.reference,
                        receipt.submitted_at.to_rfc3339()
                    );
                    if !receipt.purged {
                        report.push_str("\nwarning: local draft could not be cleared");
                    }
                    Ok(report)
                }
                Err(e) => finish(&wizard, Err(e)),
            }
        }
    }
}

/// Report the new state, or the error together with where the session stands
fn finish(wizard: &WizardController, outcome: Result<(), WizardError>) -> Result<String> {
    match outcome {
        Ok(()) => Ok(render(wizard)),
        Err(e) => {
            let hint = if e.is_retryable() { " (retry)" } else { "" };
            Err(anyhow::Error::new(e).context(format!("{}{hint}", wizard.state())))
        }
    }
}

fn render(wizard: &WizardController) -> String {
    let mut out = format!("state: {}", wizard.state());
    if wizard.state() == WizardState::At(StepId::Documents) {
        for (kind, state) in wizard.documents().iter() {
            let status = match state {
                UploadState::Done(uri) => format!("done {uri}"),
                UploadState::Uploading => "uploading".to_string(),
                UploadState::Pending => "pending".to_string(),
            };
            let _ = write!(out, "\n  {kind}: {status}");
        }
    }
    out
}

async fn read_record(step: StepId, path: &Path) -> Result<StepRecord> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_record(step, &raw).with_context(|| format!("Invalid record in {}", path.display()))
}

fn parse_record(step: StepId, raw: &str) -> Result<StepRecord> {
    Ok(match step {
        StepId::Personal => StepRecord::Personal(serde_json::from_str::<PersonalInfo>(raw)?),
        StepId::Academic => StepRecord::Academic(serde_json::from_str::<AcademicHistory>(raw)?),
        StepId::Documents => bail!("documents are filled with `upload`"),
        StepId::Review => bail!("the review step has no record"),
    })
}

async fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(UploadFile::new(name, content_type_for(path), bytes))
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
