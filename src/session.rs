//! Conversion sessions and the artifacts they own.
//!
//! One [`ConversionSession`] represents one document-to-PDF request. Each
//! session owns an isolated working directory under the configured workspace
//! root: the uploaded original, the extracted `media/` images, the rendered
//! document source, and the compiled PDF all live there and nowhere else.
//! Sessions never share files, so concurrent sessions need no locking.

use crate::error::ReportError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Subdirectory of the session that holds extracted images.
pub const MEDIA_DIR: &str = "media";

/// One document-to-PDF conversion request.
///
/// Created fresh at upload time via [`ConversionSession::create`] (which
/// clears any prior state under the same identifier, so a retried session
/// never sees stale partial output) or attached to an existing working
/// directory via [`ConversionSession::open`].
#[derive(Debug)]
pub struct ConversionSession {
    id: String,
    dir: PathBuf,
    /// Images extracted from the document, in extraction order.
    pub assets: Vec<ImageAsset>,
    /// Current markup text: raw after extraction, then normalized, then
    /// rewritten by relocation.
    pub markup: String,
}

impl ConversionSession {
    /// Create a session with a fresh random identifier.
    pub fn with_fresh_id(root: &Path) -> Result<Self, ReportError> {
        Self::create(root, uuid::Uuid::new_v4().to_string())
    }

    /// Create a session working directory for `id`, clearing prior state.
    ///
    /// The working directory is exclusively owned by this session's pipeline
    /// run; any leftovers from a previous run with the same identifier are
    /// removed first.
    pub fn create(root: &Path, id: impl Into<String>) -> Result<Self, ReportError> {
        let id = id.into();
        let dir = root.join(&id);
        if dir.exists() {
            debug!("Clearing prior session state at {}", dir.display());
            std::fs::remove_dir_all(&dir).map_err(|e| ReportError::Io {
                path: dir.clone(),
                source: e,
            })?;
        }
        std::fs::create_dir_all(&dir).map_err(|e| ReportError::Io {
            path: dir.clone(),
            source: e,
        })?;
        debug!("Created session {} at {}", id, dir.display());
        Ok(Self {
            id,
            dir,
            assets: Vec::new(),
            markup: String::new(),
        })
    }

    /// Attach to an existing session directory without clearing it.
    ///
    /// Used by the finalize flow, which must keep the images extracted at
    /// upload time so the typesetter can still resolve local references.
    pub fn open(root: &Path, id: impl Into<String>) -> Result<Self, ReportError> {
        let id = id.into();
        let dir = root.join(&id);
        if !dir.is_dir() {
            return Err(ReportError::UnknownSession { session_id: id });
        }
        Ok(Self {
            id,
            dir,
            assets: Vec::new(),
            markup: String::new(),
        })
    }

    /// Opaque unique session token.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The session's working directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory holding extracted images (`{dir}/media`). May not exist
    /// for documents without embedded images.
    pub fn media_dir(&self) -> PathBuf {
        self.dir.join(MEDIA_DIR)
    }

    /// Remove the session working directory and everything in it.
    ///
    /// Best-effort: a failure is logged, not propagated, since scrubbing is
    /// always the last thing done with a session.
    pub fn scrub(self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            warn!("Failed to scrub session {}: {}", self.id, e);
        }
    }
}

/// An image extracted from the uploaded document.
///
/// Created during extraction; `address` is assigned exactly once when
/// relocation succeeds and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAsset {
    /// Local file path within the session directory.
    pub path: PathBuf,
    /// Reference name as embedded in the markup (folder-qualified,
    /// e.g. `media/img1.png`).
    pub reference: String,
    /// Publicly resolvable address once uploaded; `None` until relocation
    /// succeeds, and left `None` if the upload failed.
    pub address: Option<String>,
}

impl ImageAsset {
    /// Bare file name of the asset (final segment of the reference).
    pub fn file_name(&self) -> &str {
        self.reference
            .rsplit('/')
            .next()
            .unwrap_or(&self.reference)
    }
}

/// The output PDF of a successfully compiled session.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledReport {
    /// Session this report belongs to, 1:1.
    pub session_id: String,
    /// Path of the PDF inside the session working directory. Exists on disk
    /// by the time this struct is constructed.
    pub pdf_path: PathBuf,
}
