//! External collaborator seams: object store, record store, user directory.
//!
//! The pipeline never talks to a concrete cloud SDK. It sees three small
//! async traits, held by the engine as `Arc<dyn …>`, so production code can
//! plug in real clients and tests can plug in fakes. The traits are the
//! contract; everything behind them is replaceable.
//!
//! Degradation policy: the object store is load-bearing (an upload failure
//! is surfaced, per-asset or fatally depending on the artifact), but the
//! record store is bookkeeping only — the engine writes statuses
//! best-effort and a [`StoreError`] there never fails a pipeline run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Sentinel returned when a user's display name cannot be resolved.
pub const UNKNOWN_USER: &str = "Unknown Student";

/// Failure reported by an external store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The store refused the specific operation (bad key, quota, 4xx).
    #[error("store rejected '{key}': {detail}")]
    Rejected { key: String, detail: String },

    /// The store could not be reached at all.
    #[error("store unavailable: {detail}")]
    Unavailable { detail: String },
}

/// Lifecycle status of a submission, keyed by session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Processing,
    Completed,
    Failed,
    FailedUpload,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Draft => "draft",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Completed => "completed",
            SubmissionStatus::Failed => "failed",
            SubmissionStatus::FailedUpload => "failed_upload",
        }
    }
}

/// Partial update merged into a submission record.
///
/// Merge semantics: fields left `None` are untouched in the stored record,
/// so a later `completed` update does not erase the `user_id` written at
/// draft time. Implementations stamp their own last-updated time.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub status: SubmissionStatus,
    pub pdf_address: Option<String>,
    pub user_id: Option<String>,
}

impl StatusUpdate {
    pub fn new(status: SubmissionStatus) -> Self {
        Self {
            status,
            pdf_address: None,
            user_id: None,
        }
    }

    pub fn with_pdf_address(mut self, address: impl Into<String>) -> Self {
        self.pdf_address = Some(address.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// External object store holding relocated images and finished PDFs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `local` under `key` and return its publicly
    /// resolvable address. Re-uploading the same key overwrites, so retries
    /// are safe.
    async fn put(&self, local: &Path, key: &str) -> Result<String, StoreError>;
}

/// Status/record store with merge-semantics documents keyed by session id.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert(&self, session_id: &str, update: StatusUpdate) -> Result<(), StoreError>;
}

/// Directory resolving user identifiers to display names.
///
/// Callers apply the [`UNKNOWN_USER`] sentinel on any failure; the trait
/// itself reports errors so implementations stay honest about them.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_name(&self, user_id: &str) -> Result<String, StoreError>;
}

// ── Bundled implementations ──────────────────────────────────────────────

/// Object store backed by a plain HTTP endpoint: `PUT {put_base}/{key}`
/// uploads the bytes, `{public_base}/{key}` is the resulting address.
///
/// Matches the contract of bucket-style stores fronted by an upload proxy.
/// Anything richer (signed URLs, SDK auth) belongs in a caller-supplied
/// implementation.
pub struct HttpObjectStore {
    client: reqwest::Client,
    put_base: String,
    public_base: String,
}

impl HttpObjectStore {
    pub fn new(put_base: impl Into<String>, public_base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            put_base: trim_slash(put_base.into()),
            public_base: trim_slash(public_base.into()),
        }
    }
}

fn trim_slash(mut s: String) -> String {
    while s.ends_with('/') {
        s.pop();
    }
    s
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(&self, local: &Path, key: &str) -> Result<String, StoreError> {
        let bytes = tokio::fs::read(local)
            .await
            .map_err(|e| StoreError::Rejected {
                key: key.to_string(),
                detail: format!("cannot read {}: {}", local.display(), e),
            })?;

        let url = format!("{}/{}", self.put_base, key);
        let response = self
            .client
            .put(&url)
            .body(bytes)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable {
                detail: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(StoreError::Rejected {
                key: key.to_string(),
                detail: format!("HTTP {}", response.status()),
            });
        }

        Ok(format!("{}/{}", self.public_base, key))
    }
}

/// Record store that acknowledges every update without persisting anything.
///
/// Use when status bookkeeping is not wired up (CLI one-shot runs, tests).
pub struct NoopRecordStore;

#[async_trait]
impl RecordStore for NoopRecordStore {
    async fn upsert(&self, session_id: &str, update: StatusUpdate) -> Result<(), StoreError> {
        debug!(
            "Skipping record update (no store): {} -> {}",
            session_id,
            update.status.as_str()
        );
        Ok(())
    }
}

/// User directory that knows nobody; every lookup resolves to the
/// [`UNKNOWN_USER`] sentinel at the call site.
pub struct NullUserDirectory;

#[async_trait]
impl UserDirectory for NullUserDirectory {
    async fn get_name(&self, user_id: &str) -> Result<String, StoreError> {
        Err(StoreError::Unavailable {
            detail: format!("no user directory configured (user {})", user_id),
        })
    }
}

/// Object store for flows that never touch it (standardize-only engines).
/// Any actual call is a configuration mistake and fails loudly.
pub struct NullObjectStore;

#[async_trait]
impl ObjectStore for NullObjectStore {
    async fn put(&self, _local: &Path, key: &str) -> Result<String, StoreError> {
        Err(StoreError::Rejected {
            key: key.to_string(),
            detail: "no object store configured".into(),
        })
    }
}
