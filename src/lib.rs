//! # report-forge
//!
//! Standardize word-processor documents into templated PDF reports.
//!
//! ## Why this crate?
//!
//! Students and teams submit reports as .docx files with wildly inconsistent
//! front pages, fonts, and figure handling. This crate converts an uploaded
//! document into editable Markdown, normalizes the math notation the
//! converter mangles, moves embedded images to an object store so the markup
//! is portable, merges caller-supplied metadata into a report-type-specific
//! front page, and typesets the result into a uniform PDF.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .docx
//!  │
//!  ├─ 1. Extract   pandoc docx → Markdown, images into {session}/media/
//!  ├─ 2. Mathfix   \$…\$ / \$\$…\$\$ → $…$ / $$…$$
//!  │               (caller edits the markup here, in the upload flow)
//!  ├─ 3. Relocate  upload images, rewrite references to public addresses
//!  ├─ 4. Render    metadata + template + body → document source
//!  └─ 5. Compile   pandoc + LaTeX engine → report.pdf (atomic, timed)
//! ```
//!
//! Each conversion runs in an isolated session directory keyed by an opaque
//! token; sessions are fully independent and safe to run concurrently.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use report_forge::{
//!     EngineConfig, NoopRecordStore, NullObjectStore, NullUserDirectory,
//!     ReportEngine, ReportMetadata, ReportType,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = ReportEngine::new(
//!         EngineConfig::default(),
//!         Arc::new(NullObjectStore),
//!         Arc::new(NoopRecordStore),
//!         Arc::new(NullUserDirectory),
//!     );
//!     let metadata = ReportMetadata {
//!         title: Some("Thesis".into()),
//!         ..Default::default()
//!     };
//!     let report = engine
//!         .standardize("thesis.docx".as_ref(), ReportType::Default, &metadata)
//!         .await?;
//!     println!("{}", report.pdf_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `report-forge` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! report-forge = { version = "0.1", default-features = false }
//! ```
//!
//! ## External requirements
//!
//! The pipeline shells out to [pandoc](https://pandoc.org) for both document
//! conversion and typesetting, and pandoc in turn needs a LaTeX engine
//! (`xelatex` by default) for PDF output. Both are configurable through
//! [`EngineConfig`]; a missing binary surfaces as
//! [`ReportError::Environment`] rather than a silent degradation.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod session;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EngineConfig, EngineConfigBuilder};
pub use engine::{FinalizedReport, IngestOutcome, ReportEngine};
pub use error::{AssetError, ReportError};
pub use pipeline::mathfix::normalize_math;
pub use pipeline::relocate::{RelocationOutcome, RelocationReport};
pub use pipeline::render::render_document;
pub use report::{ReportMetadata, ReportType, ResolvedMetadata};
pub use session::{CompiledReport, ConversionSession, ImageAsset};
pub use store::{
    HttpObjectStore, NoopRecordStore, NullObjectStore, NullUserDirectory, ObjectStore,
    RecordStore, StatusUpdate, StoreError, SubmissionStatus, UserDirectory, UNKNOWN_USER,
};
