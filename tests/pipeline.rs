//! Integration tests for the full conversion pipeline.
//!
//! The external toolchain is replaced by small shell-script stubs that honour
//! the same argument contract as pandoc (markup extraction with
//! `--extract-media`, PDF output via `-o`), and the external stores are
//! in-memory fakes, so the whole ingest → finalize choreography runs
//! hermetically. Stub scripts make these tests unix-only.

#![cfg(unix)]

use async_trait::async_trait;
use report_forge::{
    EngineConfig, ObjectStore, RecordStore, RelocationOutcome, ReportEngine, ReportError,
    ReportMetadata, ReportType, StatusUpdate, StoreError, SubmissionStatus, UserDirectory,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Toolchain stubs ──────────────────────────────────────────────────────────

/// Stub that extracts a one-image, one-equation document and "typesets"
/// by writing a PDF magic header to the requested output file.
const GOOD_TOOLCHAIN: &str = r#"#!/bin/sh
set -e
mode=compile
out=""
prev=""
for a in "$@"; do
  [ "$prev" = "-o" ] && out="$a"
  [ "$a" = "gfm" ] && mode=extract
  prev="$a"
done
if [ "$mode" = "extract" ]; then
  mkdir -p media
  printf 'fakepng' > media/img1.png
  printf '# Heading\n\n![diagram](./media/img1.png)\n\nInline \\$x^2\\$ math.\n'
else
  printf '%%PDF-1.4 stub\n' > "$out"
fi
"#;

/// Stub that rejects every document, as pandoc does for corrupt input.
const REJECTING_TOOLCHAIN: &str = r#"#!/bin/sh
echo "stub: couldn't unpack docx container" >&2
exit 2
"#;

/// Stub whose extraction works but whose typesetting fails.
const BROKEN_TYPESETTER: &str = r#"#!/bin/sh
mode=compile
for a in "$@"; do
  [ "$a" = "gfm" ] && mode=extract
done
if [ "$mode" = "extract" ]; then
  printf '# Heading\n'
else
  echo "! LaTeX Error: Undefined control sequence." >&2
  exit 43
fi
"#;

fn write_stub(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    let mut perm = std::fs::metadata(&path).unwrap().permissions();
    perm.set_mode(0o755);
    std::fs::set_permissions(&path, perm).unwrap();
    path.to_string_lossy().into_owned()
}

// ── Store fakes ──────────────────────────────────────────────────────────────

#[derive(Default)]
struct MemoryObjectStore {
    keys: Mutex<Vec<String>>,
    /// Keys containing this substring fail with `Unavailable`.
    fail_on: Option<String>,
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, _local: &Path, key: &str) -> Result<String, StoreError> {
        if let Some(ref needle) = self.fail_on {
            if key.contains(needle.as_str()) {
                return Err(StoreError::Unavailable {
                    detail: "injected outage".into(),
                });
            }
        }
        self.keys.lock().unwrap().push(key.to_string());
        Ok(format!("https://store.example/{}", key))
    }
}

#[derive(Default)]
struct MemoryRecordStore {
    updates: Mutex<Vec<(String, StatusUpdate)>>,
}

impl MemoryRecordStore {
    fn statuses_for(&self, session_id: &str) -> Vec<SubmissionStatus> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == session_id)
            .map(|(_, u)| u.status)
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert(&self, session_id: &str, update: StatusUpdate) -> Result<(), StoreError> {
        self.updates
            .lock()
            .unwrap()
            .push((session_id.to_string(), update));
        Ok(())
    }
}

struct StaticUsers;

#[async_trait]
impl UserDirectory for StaticUsers {
    async fn get_name(&self, user_id: &str) -> Result<String, StoreError> {
        match user_id {
            "u-jane" => Ok("Jane Scholar".to_string()),
            _ => Err(StoreError::Unavailable {
                detail: "unknown user".into(),
            }),
        }
    }
}

// ── Harness ──────────────────────────────────────────────────────────────────

struct Harness {
    _tmp: TempDir,
    workspace: PathBuf,
    document: PathBuf,
    objects: Arc<MemoryObjectStore>,
    records: Arc<MemoryRecordStore>,
}

impl Harness {
    fn new(objects: MemoryObjectStore) -> Self {
        let tmp = TempDir::new().unwrap();
        let workspace = tmp.path().join("workspace");
        let document = tmp.path().join("my_thesis_draft.docx");
        std::fs::write(&document, b"PK\x03\x04 not really a docx").unwrap();
        Self {
            workspace,
            document,
            objects: Arc::new(objects),
            records: Arc::new(MemoryRecordStore::default()),
            _tmp: tmp,
        }
    }

    fn engine_with(&self, toolchain_body: &str) -> ReportEngine {
        let bin = write_stub(self._tmp.path(), "stub-toolchain", toolchain_body);
        let config = EngineConfig::builder()
            .workspace_root(self.workspace.clone())
            .converter_bin(bin)
            .compile_timeout_secs(10)
            .build()
            .unwrap();
        ReportEngine::new(
            config,
            self.objects.clone(),
            self.records.clone(),
            Arc::new(StaticUsers),
        )
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_upload_edit_finalize() {
    let h = Harness::new(MemoryObjectStore::default());
    let engine = h.engine_with(GOOD_TOOLCHAIN);

    // Upload: extract, normalize math, relocate the image.
    let outcome = engine.ingest(&h.document, Some("u-jane")).await.unwrap();
    let session_id = outcome.session.id().to_string();

    assert_eq!(outcome.user_name, "Jane Scholar");
    assert!(
        outcome.session.markup.contains("$x^2$"),
        "escaped math should be normalized, got:\n{}",
        outcome.session.markup
    );
    let expected_address = format!(
        "https://store.example/temp_reports/{}/media/img1.png",
        session_id
    );
    assert!(outcome.session.markup.contains(&expected_address));
    assert!(!outcome.session.markup.contains("(./media/img1.png)"));
    assert_eq!(outcome.relocation.len(), 1);
    assert!(matches!(
        outcome.relocation[0],
        RelocationOutcome::Uploaded { ref file, .. } if file == "img1.png"
    ));
    assert_eq!(outcome.session.assets.len(), 1);
    assert!(outcome.session.assets[0].address.is_some());
    assert_eq!(
        h.records.statuses_for(&session_id),
        vec![SubmissionStatus::Draft]
    );

    // Finalize with edited markup and supplied title.
    let metadata = ReportMetadata {
        title: Some("Thesis".into()),
        ..Default::default()
    };
    let edited = format!("{}\n\nOne more paragraph.\n", outcome.session.markup);
    let finalized = engine
        .finalize(&session_id, &edited, &metadata, ReportType::Default)
        .await
        .unwrap();

    assert!(finalized.report.pdf_path.exists());
    let bytes = std::fs::read(&finalized.report.pdf_path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(
        finalized.pdf_address,
        format!("https://store.example/report_submissions/{}.pdf", session_id)
    );
    assert_eq!(
        h.records.statuses_for(&session_id),
        vec![
            SubmissionStatus::Draft,
            SubmissionStatus::Processing,
            SubmissionStatus::Completed
        ]
    );
    let updates = h.records.updates.lock().unwrap();
    let completed = updates
        .iter()
        .find(|(_, u)| u.status == SubmissionStatus::Completed)
        .unwrap();
    assert_eq!(completed.1.pdf_address.as_deref(), Some(finalized.pdf_address.as_str()));

    // The rendered source fed to the typesetter carries the metadata.
    let source = std::fs::read_to_string(
        finalized.report.pdf_path.parent().unwrap().join("report.md"),
    )
    .unwrap();
    assert!(source.contains("title: \"Thesis\""));
    assert!(source.contains("One more paragraph."));
}

#[tokio::test]
async fn rejected_document_is_conversion_error_and_scrubs_session() {
    let h = Harness::new(MemoryObjectStore::default());
    let engine = h.engine_with(REJECTING_TOOLCHAIN);

    let err = engine.ingest(&h.document, None).await.unwrap_err();
    assert!(matches!(err, ReportError::Conversion { .. }));
    assert!(err.to_string().contains("Could not read document"));

    // Failed session left nothing behind.
    let leftovers = std::fs::read_dir(&h.workspace)
        .map(|d| d.count())
        .unwrap_or(0);
    assert_eq!(leftovers, 0);
    // And no record was created for a document we never accepted.
    assert!(h.records.updates.lock().unwrap().is_empty());
}

#[tokio::test]
async fn typeset_failure_records_failed_and_exposes_no_artifact() {
    let h = Harness::new(MemoryObjectStore::default());
    let good = h.engine_with(GOOD_TOOLCHAIN);
    let outcome = good.ingest(&h.document, None).await.unwrap();
    let session_id = outcome.session.id().to_string();

    let broken = h.engine_with(BROKEN_TYPESETTER);
    let err = broken
        .finalize(
            &session_id,
            &outcome.session.markup,
            &ReportMetadata::default(),
            ReportType::Default,
        )
        .await
        .unwrap_err();

    assert!(err.is_compilation());
    assert!(err.to_string().contains("LaTeX Error"));
    assert!(!h.workspace.join(&session_id).join("report.pdf").exists());
    assert_eq!(
        h.records.statuses_for(&session_id),
        vec![
            SubmissionStatus::Draft,
            SubmissionStatus::Processing,
            SubmissionStatus::Failed
        ]
    );
}

#[tokio::test]
async fn pdf_upload_outage_records_failed_upload() {
    let h = Harness::new(MemoryObjectStore {
        fail_on: Some(".pdf".into()),
        ..Default::default()
    });
    let engine = h.engine_with(GOOD_TOOLCHAIN);

    let outcome = engine.ingest(&h.document, None).await.unwrap();
    let session_id = outcome.session.id().to_string();

    let err = engine
        .finalize(
            &session_id,
            &outcome.session.markup,
            &ReportMetadata::default(),
            ReportType::Default,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ReportError::Upload { .. }));
    assert_eq!(
        h.records.statuses_for(&session_id).last(),
        Some(&SubmissionStatus::FailedUpload)
    );
}

#[tokio::test]
async fn finalize_unknown_session_fails_cleanly() {
    let h = Harness::new(MemoryObjectStore::default());
    let engine = h.engine_with(GOOD_TOOLCHAIN);

    let err = engine
        .finalize(
            "no-such-session",
            "# body",
            &ReportMetadata::default(),
            ReportType::Default,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReportError::UnknownSession { .. }));
}

#[tokio::test]
async fn standardize_produces_pdf_with_derived_title() {
    let h = Harness::new(MemoryObjectStore::default());
    let engine = h.engine_with(GOOD_TOOLCHAIN);

    let report = engine
        .standardize(
            &h.document,
            ReportType::MiniProject,
            &ReportMetadata::default(),
        )
        .await
        .unwrap();

    assert!(report.pdf_path.exists());
    let source =
        std::fs::read_to_string(report.pdf_path.parent().unwrap().join("report.md")).unwrap();
    // Title derived from "my_thesis_draft.docx"; images keep local refs.
    assert!(source.contains("My Thesis Draft"));
    assert!(source.contains("Mini Project Report"));
    assert!(source.contains("(./media/img1.png)"));
    // No object-store traffic in the one-shot flow.
    assert!(h.objects.keys.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_user_falls_back_to_sentinel() {
    let h = Harness::new(MemoryObjectStore::default());
    let engine = h.engine_with(GOOD_TOOLCHAIN);

    let outcome = engine.ingest(&h.document, Some("u-stranger")).await.unwrap();
    assert_eq!(outcome.user_name, "Unknown Student");
}

#[tokio::test]
async fn concurrent_sessions_do_not_interfere() {
    let h = Harness::new(MemoryObjectStore::default());
    let engine = Arc::new(h.engine_with(GOOD_TOOLCHAIN));

    let (a, b) = tokio::join!(
        engine.ingest(&h.document, None),
        engine.ingest(&h.document, None)
    );
    let a = a.unwrap();
    let b = b.unwrap();

    assert_ne!(a.session.id(), b.session.id());
    assert!(a.session.dir().exists());
    assert!(b.session.dir().exists());
    // Each session's markup points at its own relocated asset.
    assert!(a.session.markup.contains(a.session.id()));
    assert!(b.session.markup.contains(b.session.id()));
}
