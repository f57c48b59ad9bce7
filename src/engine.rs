//! Engine entry points: the three flows a caller drives.
//!
//! * [`ReportEngine::ingest`] — upload flow: create a session, extract and
//!   normalize the markup, relocate images, record a `draft` status. The
//!   caller gets editable markup back.
//! * [`ReportEngine::finalize`] — editor flow: take (possibly edited)
//!   markup plus metadata, render, compile, upload the PDF, and walk the
//!   status machine to `completed` (or a terminal failure).
//! * [`ReportEngine::standardize`] — one-shot flow: document in, local PDF
//!   path out, no object store and no bookkeeping. Images stay in the
//!   session directory where the typesetter resolves them.
//!
//! External collaborators are explicit dependencies (`Arc<dyn …>`), handed
//! in at construction, so tests substitute fakes and nothing reaches for a
//! global client. Sessions are independent: the engine is `Send + Sync`,
//! every method takes `&self`, and the only long-running await (the
//! typesetter) yields to the runtime, so one slow compile never stalls
//! another session's request.
//!
//! Status writes are best-effort by design: a down record store degrades
//! bookkeeping, never the pipeline.

use crate::config::EngineConfig;
use crate::error::ReportError;
use crate::pipeline::relocate::RelocationOutcome;
use crate::pipeline::{compile, extract, mathfix, relocate, render};
use crate::report::{title_from_filename, ReportMetadata, ReportType};
use crate::session::{CompiledReport, ConversionSession};
use crate::store::{
    ObjectStore, RecordStore, StatusUpdate, SubmissionStatus, UserDirectory, UNKNOWN_USER,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The conversion engine. One per process; cheap to share.
pub struct ReportEngine {
    config: EngineConfig,
    objects: Arc<dyn ObjectStore>,
    records: Arc<dyn RecordStore>,
    users: Arc<dyn UserDirectory>,
}

/// Result of the upload flow: the session (markup populated and images
/// relocated), per-asset relocation outcomes, and the owning user's
/// display name.
#[derive(Debug)]
pub struct IngestOutcome {
    pub session: ConversionSession,
    pub relocation: Vec<RelocationOutcome>,
    pub user_name: String,
}

/// Result of the finalize flow.
#[derive(Debug)]
pub struct FinalizedReport {
    pub report: CompiledReport,
    /// Public address of the uploaded PDF.
    pub pdf_address: String,
}

impl ReportEngine {
    pub fn new(
        config: EngineConfig,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            config,
            objects,
            records,
            users,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Upload flow: convert `document` into editable markup.
    ///
    /// Creates a fresh session, copies the original into it, extracts and
    /// normalizes the markup, relocates every extracted image, and records
    /// a `draft` status owned by `user_id` (when given). A conversion
    /// failure scrubs the session and surfaces as
    /// [`ReportError::Conversion`]; individual relocation failures do not
    /// fail the call and are reported in [`IngestOutcome::relocation`].
    pub async fn ingest(
        &self,
        document: &Path,
        user_id: Option<&str>,
    ) -> Result<IngestOutcome, ReportError> {
        let mut session = ConversionSession::with_fresh_id(&self.config.workspace_root)?;
        info!("Session {}: ingest {}", session.id(), document.display());

        let local_document = self.keep_original(&session, document).await?;

        let extracted =
            match extract::extract_markup(&self.config, &session, &local_document).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    session.scrub();
                    return Err(e);
                }
            };

        session.assets = extracted.images;
        let markup = mathfix::normalize_math(&extracted.markup);

        let session_id = session.id().to_string();
        let report = relocate::relocate_assets(
            self.objects.as_ref(),
            &self.config,
            &session_id,
            &mut session.assets,
            &markup,
        )
        .await;
        session.markup = report.markup;

        let mut update = StatusUpdate::new(SubmissionStatus::Draft);
        if let Some(uid) = user_id {
            update = update.with_user(uid);
        }
        self.record_status(session.id(), update).await;

        let user_name = match user_id {
            Some(uid) => self
                .users
                .get_name(uid)
                .await
                .unwrap_or_else(|e| {
                    warn!("User lookup failed for {}: {}", uid, e);
                    UNKNOWN_USER.to_string()
                }),
            None => UNKNOWN_USER.to_string(),
        };

        Ok(IngestOutcome {
            session,
            relocation: report.outcomes,
            user_name,
        })
    }

    /// Editor flow: compile the (possibly edited) markup into the final,
    /// uploaded PDF.
    ///
    /// Walks the status machine: `processing` at entry, then `completed`
    /// with the PDF address, or `failed` / `failed_upload` on the way out.
    /// Terminal-failure writes are best-effort — the original error always
    /// wins over a secondary bookkeeping failure.
    pub async fn finalize(
        &self,
        session_id: &str,
        markup: &str,
        metadata: &ReportMetadata,
        report_type: ReportType,
    ) -> Result<FinalizedReport, ReportError> {
        let session = ConversionSession::open(&self.config.workspace_root, session_id)?;
        info!("Session {}: finalize as {}", session.id(), report_type);

        self.record_status(session.id(), StatusUpdate::new(SubmissionStatus::Processing))
            .await;

        // An empty editor submission still produces a document.
        let markup = if markup.trim().is_empty() {
            warn!("Session {}: empty markup, using placeholder", session.id());
            "# Report\n\n(No content provided)".to_string()
        } else {
            markup.to_string()
        };

        let source = render::render_document(&markup, metadata, report_type);

        let pdf_path = match compile::compile_pdf(&self.config, &session, &source).await {
            Ok(path) => path,
            Err(e) => {
                self.record_status(session.id(), StatusUpdate::new(SubmissionStatus::Failed))
                    .await;
                return Err(e);
            }
        };

        let key = format!("{}/{}.pdf", self.config.report_key_prefix, session.id());
        let pdf_address = match self.objects.put(&pdf_path, &key).await {
            Ok(address) => address,
            Err(e) => {
                self.record_status(
                    session.id(),
                    StatusUpdate::new(SubmissionStatus::FailedUpload),
                )
                .await;
                return Err(ReportError::Upload {
                    detail: e.to_string(),
                });
            }
        };

        self.record_status(
            session.id(),
            StatusUpdate::new(SubmissionStatus::Completed).with_pdf_address(&pdf_address),
        )
        .await;

        Ok(FinalizedReport {
            report: CompiledReport {
                session_id: session.id().to_string(),
                pdf_path,
            },
            pdf_address,
        })
    }

    /// One-shot flow: document in, standardized local PDF out.
    ///
    /// No relocation and no record store: images keep their local `media/`
    /// references, which the typesetter resolves from the session
    /// directory. When the caller supplied no title, one is derived from
    /// the uploaded file name.
    pub async fn standardize(
        &self,
        document: &Path,
        report_type: ReportType,
        metadata: &ReportMetadata,
    ) -> Result<CompiledReport, ReportError> {
        let mut session = ConversionSession::with_fresh_id(&self.config.workspace_root)?;
        info!(
            "Session {}: standardize {} as {}",
            session.id(),
            document.display(),
            report_type
        );

        let local_document = self.keep_original(&session, document).await?;

        let extracted =
            match extract::extract_markup(&self.config, &session, &local_document).await {
                Ok(extracted) => extracted,
                Err(e) => {
                    session.scrub();
                    return Err(e);
                }
            };
        session.assets = extracted.images;
        session.markup = mathfix::normalize_math(&extracted.markup);

        let mut metadata = metadata.clone();
        if metadata.title.as_deref().map_or(true, |t| t.trim().is_empty()) {
            if let Some(name) = document.file_name() {
                metadata.title = Some(title_from_filename(&name.to_string_lossy()));
            }
        }

        let source = render::render_document(&session.markup, &metadata, report_type);
        let pdf_path = compile::compile_pdf(&self.config, &session, &source).await?;

        Ok(CompiledReport {
            session_id: session.id().to_string(),
            pdf_path,
        })
    }

    /// Copy the uploaded original into the session directory, which owns
    /// every intermediate file from here on.
    async fn keep_original(
        &self,
        session: &ConversionSession,
        document: &Path,
    ) -> Result<std::path::PathBuf, ReportError> {
        if !document.exists() {
            return Err(ReportError::FileNotFound {
                path: document.to_path_buf(),
            });
        }
        let file_name = document
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.docx".to_string());
        let target = session.dir().join(file_name);
        tokio::fs::copy(document, &target)
            .await
            .map_err(|e| ReportError::Io {
                path: target.clone(),
                source: e,
            })?;
        Ok(target)
    }

    /// Best-effort status write; a store failure is logged and swallowed.
    async fn record_status(&self, session_id: &str, update: StatusUpdate) {
        let status = update.status;
        if let Err(e) = self.records.upsert(session_id, update).await {
            warn!(
                "Session {}: status update to '{}' dropped: {}",
                session_id,
                status.as_str(),
                e
            );
        }
    }
}
