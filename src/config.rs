//! Configuration for the report engine.
//!
//! All engine behaviour is controlled through [`EngineConfig`], built via its
//! [`EngineConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across sessions, log them, and diff two runs to
//! understand why their outputs differ.

use crate::error::ReportError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a [`crate::engine::ReportEngine`].
///
/// Built via [`EngineConfig::builder()`] or [`EngineConfig::default()`].
///
/// # Example
/// ```rust
/// use report_forge::EngineConfig;
///
/// let config = EngineConfig::builder()
///     .workspace_root("/var/lib/report-forge")
///     .compile_timeout_secs(180)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory under which session working directories are created,
    /// one subdirectory per session identifier.
    /// Default: `$TMPDIR/report-forge`.
    pub workspace_root: PathBuf,

    /// Document-conversion binary (docx → markup). Default: `pandoc`.
    ///
    /// Resolved through `$PATH` unless an absolute path is given. The same
    /// binary also drives typesetting; pandoc covers both contracts.
    pub converter_bin: String,

    /// PDF engine handed to the typesetter (`--pdf-engine`). Default: `xelatex`.
    pub pdf_engine: String,

    /// Wall-clock budget for the docx → markup conversion, in seconds.
    /// Default: 60.
    ///
    /// Conversion is fast for well-formed documents; a hang here almost
    /// always means a corrupt input, so a short budget is fine.
    pub convert_timeout_secs: u64,

    /// Wall-clock budget for PDF compilation, in seconds. Default: 120.
    ///
    /// LaTeX runs are the single long-running step of the pipeline. The
    /// budget bounds how long one session can occupy a worker; on expiry the
    /// typesetter process is killed and the session fails with a
    /// compilation error the caller can retry.
    pub compile_timeout_secs: u64,

    /// Object-store key prefix for relocated images.
    /// Default: `temp_reports`. Keys take the form
    /// `{prefix}/{session}/media/{filename}`.
    pub asset_key_prefix: String,

    /// Object-store key prefix for finished PDFs.
    /// Default: `report_submissions`. Keys take the form
    /// `{prefix}/{session}.pdf`.
    pub report_key_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir().join("report-forge"),
            converter_bin: "pandoc".to_string(),
            pdf_engine: "xelatex".to_string(),
            convert_timeout_secs: 60,
            compile_timeout_secs: 120,
            asset_key_prefix: "temp_reports".to_string(),
            report_key_prefix: "report_submissions".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create a new builder for `EngineConfig`.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`EngineConfig`].
#[derive(Debug)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = root.into();
        self
    }

    pub fn converter_bin(mut self, bin: impl Into<String>) -> Self {
        self.config.converter_bin = bin.into();
        self
    }

    pub fn pdf_engine(mut self, engine: impl Into<String>) -> Self {
        self.config.pdf_engine = engine.into();
        self
    }

    pub fn convert_timeout_secs(mut self, secs: u64) -> Self {
        self.config.convert_timeout_secs = secs.max(1);
        self
    }

    pub fn compile_timeout_secs(mut self, secs: u64) -> Self {
        self.config.compile_timeout_secs = secs.max(1);
        self
    }

    pub fn asset_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.asset_key_prefix = prefix.into();
        self
    }

    pub fn report_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.report_key_prefix = prefix.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<EngineConfig, ReportError> {
        let c = &self.config;
        if c.converter_bin.is_empty() {
            return Err(ReportError::InvalidConfig(
                "converter binary must not be empty".into(),
            ));
        }
        if c.pdf_engine.is_empty() {
            return Err(ReportError::InvalidConfig(
                "pdf engine must not be empty".into(),
            ));
        }
        if c.asset_key_prefix.is_empty() || c.report_key_prefix.is_empty() {
            return Err(ReportError::InvalidConfig(
                "object-store key prefixes must not be empty".into(),
            ));
        }
        if c.asset_key_prefix.contains('/') || c.report_key_prefix.contains('/') {
            return Err(ReportError::InvalidConfig(
                "object-store key prefixes must be single path segments".into(),
            ));
        }
        Ok(self.config)
    }
}
