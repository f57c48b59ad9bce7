//! Error types for the report-forge library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ReportError`] — **Fatal**: the current request cannot proceed (the
//!   converter rejected the document, the typesetter failed or timed out, a
//!   toolchain binary is missing). Returned as `Err(ReportError)` from the
//!   engine entry points.
//!
//! * [`AssetError`] — **Non-fatal**: a single extracted image failed to
//!   relocate, but the rest of the batch is fine. Stored inside
//!   [`crate::pipeline::relocate::RelocationOutcome`] so callers can inspect
//!   partial success rather than losing the whole upload to one bad image.
//!
//! The taxonomy is caller-facing: a [`ReportError::Conversion`] means "we
//! could not read your document", a [`ReportError::Compilation`] (or timeout)
//! means "we could not produce the PDF", and a [`ReportError::Upload`] means
//! "we could not upload the result". [`ReportError::Environment`] is the one
//! non-retryable case — the host is misconfigured and no amount of edited
//! input will help.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the report-forge engine.
///
/// Per-asset relocation failures use [`AssetError`] and are collected in
/// batch results rather than propagated here.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Uploaded document was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the document.
    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: PathBuf },

    /// No session working directory exists for the given identifier.
    #[error("Unknown session '{session_id}': no working directory found")]
    UnknownSession { session_id: String },

    // ── Conversion errors (document → markup) ─────────────────────────────
    /// The document-conversion toolchain rejected the input or produced
    /// no output.
    #[error("Could not read document: {detail}")]
    Conversion { detail: String },

    // ── Compilation errors (markup → PDF) ─────────────────────────────────
    /// The typesetting toolchain reported an error in the rendered source.
    ///
    /// Recoverable: the caller can edit the markup and retry the same
    /// session.
    #[error("Could not produce PDF: {detail}")]
    Compilation { detail: String },

    /// Typesetting exceeded the configured wall-clock budget.
    ///
    /// Classified with [`ReportError::Compilation`] for caller-facing
    /// purposes; kept as its own variant so the timeout is visible in logs.
    #[error("PDF compilation timed out after {secs}s")]
    CompileTimeout { secs: u64 },

    // ── Environment errors ────────────────────────────────────────────────
    /// An external toolchain binary is missing or not executable.
    ///
    /// Fatal and not retryable: fix the host, not the request.
    #[error("Toolchain '{binary}' is not available: {detail}\nInstall it or point the engine at it via EngineConfig.")]
    Environment { binary: String, detail: String },

    // ── Upload errors (final artifact) ────────────────────────────────────
    /// The compiled PDF could not be handed to the object store.
    #[error("Could not upload the result: {detail}")]
    Upload { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a file inside the session directory.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReportError {
    /// True when retrying the same request — possibly with edited markup —
    /// can reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReportError::Compilation { .. }
                | ReportError::CompileTimeout { .. }
                | ReportError::Upload { .. }
        )
    }

    /// True for caller-facing "could not produce the PDF" failures.
    pub fn is_compilation(&self) -> bool {
        matches!(
            self,
            ReportError::Compilation { .. } | ReportError::CompileTimeout { .. }
        )
    }
}

/// A non-fatal error for a single extracted image.
///
/// Stored in [`crate::pipeline::relocate::RelocationOutcome::Failed`]; the
/// batch continues and the image's markup reference is left untouched.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum AssetError {
    /// The object store rejected the upload.
    #[error("Asset '{name}': upload failed: {detail}")]
    UploadFailed { name: String, detail: String },

    /// The extracted file vanished or could not be read back.
    #[error("Asset '{name}': unreadable: {detail}")]
    Unreadable { name: String, detail: String },
}

impl AssetError {
    /// Original file name of the asset this error concerns.
    pub fn asset_name(&self) -> &str {
        match self {
            AssetError::UploadFailed { name, .. } => name,
            AssetError::Unreadable { name, .. } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_and_compilation_are_distinguishable() {
        let conv = ReportError::Conversion {
            detail: "not a docx".into(),
        };
        let comp = ReportError::Compilation {
            detail: "undefined control sequence".into(),
        };
        assert!(conv.to_string().contains("read document"));
        assert!(comp.to_string().contains("produce PDF"));
        assert!(!conv.is_compilation());
        assert!(comp.is_compilation());
    }

    #[test]
    fn timeout_counts_as_compilation() {
        let e = ReportError::CompileTimeout { secs: 120 };
        assert!(e.is_compilation());
        assert!(e.is_retryable());
        assert!(e.to_string().contains("120s"));
    }

    #[test]
    fn environment_is_not_retryable() {
        let e = ReportError::Environment {
            binary: "pandoc".into(),
            detail: "No such file or directory".into(),
        };
        assert!(!e.is_retryable());
        assert!(e.to_string().contains("pandoc"));
    }

    #[test]
    fn asset_error_display() {
        let e = AssetError::UploadFailed {
            name: "img1.png".into(),
            detail: "HTTP 503".into(),
        };
        assert_eq!(e.asset_name(), "img1.png");
        assert!(e.to_string().contains("HTTP 503"));
    }
}
