//! CLI binary for report-forge.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `EngineConfig` / `ReportMetadata` and drives the one-shot
//! standardize flow.

use anyhow::{Context, Result};
use clap::Parser;
use report_forge::{
    EngineConfig, NoopRecordStore, NullObjectStore, NullUserDirectory, ReportEngine,
    ReportMetadata, ReportType,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Standardize a document with the default front page
  report-forge thesis.docx -o thesis.pdf

  # Mini-project variant with full metadata
  report-forge report.docx -o report.pdf \
      --report-type mini-project \
      --title "Traffic Sign Recognition" \
      --author "A. Student" --roll-no 42 \
      --department "Computer Science" \
      --guide "Dr. Guide" --session-year 2024-2025

  # Print the result as JSON (session id + artifact path)
  report-forge report.docx --json

REPORT TYPES:
  default, micro-project, mini-project, capstone
  Unrecognized values fall back to the default template.

SETUP:
  The pipeline shells out to pandoc for conversion and typesetting, and
  pandoc needs a LaTeX engine (xelatex by default) for PDF output:

    apt install pandoc texlive-xetex        # Debian/Ubuntu
    brew install pandoc && brew install --cask mactex-no-gui

  Override binaries with --converter-bin / --pdf-engine if they are not
  on PATH under their usual names.
"#;

/// Standardize word-processor documents into templated PDF reports.
#[derive(Parser, Debug)]
#[command(
    name = "report-forge",
    version,
    about = "Standardize word-processor documents into templated PDF reports",
    long_about = "Convert a .docx document into a standardized PDF report: extract the content \
to Markdown, fix math notation, merge metadata into a report-type-specific front page, and \
typeset the result with pandoc + LaTeX.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the .docx document to standardize.
    input: PathBuf,

    /// Write the PDF to this path (default: alongside the input).
    #[arg(short, long, env = "REPORT_FORGE_OUTPUT")]
    output: Option<PathBuf>,

    /// Front-page template: default, micro-project, mini-project, capstone.
    #[arg(long, env = "REPORT_FORGE_TYPE", default_value = "default")]
    report_type: String,

    /// Report title (default: derived from the file name).
    #[arg(long)]
    title: Option<String>,

    /// Author name shown on the front page.
    #[arg(long)]
    author: Option<String>,

    /// Roll number shown on the front page.
    #[arg(long)]
    roll_no: Option<String>,

    /// Department shown on the front page.
    #[arg(long)]
    department: Option<String>,

    /// Guide/supervisor name shown on the front page.
    #[arg(long)]
    guide: Option<String>,

    /// Academic session, e.g. 2024-2025.
    #[arg(long)]
    session_year: Option<String>,

    /// Abstract text, rendered on its own page when given.
    #[arg(long, value_name = "TEXT")]
    abstract_text: Option<String>,

    /// Root directory for session working directories.
    #[arg(long, env = "REPORT_FORGE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Converter/typesetter binary.
    #[arg(long, env = "REPORT_FORGE_CONVERTER", default_value = "pandoc")]
    converter_bin: String,

    /// PDF engine handed to the typesetter.
    #[arg(long, env = "REPORT_FORGE_PDF_ENGINE", default_value = "xelatex")]
    pdf_engine: String,

    /// PDF compilation timeout in seconds.
    #[arg(long, env = "REPORT_FORGE_COMPILE_TIMEOUT", default_value_t = 120)]
    compile_timeout: u64,

    /// Print the result as JSON instead of a human-readable line.
    #[arg(long, env = "REPORT_FORGE_JSON")]
    json: bool,

    /// Keep the session working directory for inspection.
    #[arg(long)]
    keep_workdir: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "REPORT_FORGE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "REPORT_FORGE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let mut config = EngineConfig::builder()
        .converter_bin(&cli.converter_bin)
        .pdf_engine(&cli.pdf_engine)
        .compile_timeout_secs(cli.compile_timeout);
    if let Some(ref workspace) = cli.workspace {
        config = config.workspace_root(workspace.clone());
    }
    let config = config.build().context("Invalid configuration")?;

    // The standardize flow never touches the object or record stores.
    let engine = ReportEngine::new(
        config,
        Arc::new(NullObjectStore),
        Arc::new(NoopRecordStore),
        Arc::new(NullUserDirectory),
    );

    let metadata = ReportMetadata {
        title: cli.title.clone(),
        abstract_text: cli.abstract_text.clone(),
        author_name: cli.author.clone(),
        roll_no: cli.roll_no.clone(),
        department: cli.department.clone(),
        guide_name: cli.guide.clone(),
        session_year: cli.session_year.clone(),
    };
    let report_type = ReportType::parse(&cli.report_type);

    let report = engine
        .standardize(&cli.input, report_type, &metadata)
        .await
        .context("Standardization failed")?;

    // Move the artifact out of the session directory when requested.
    let final_path = match cli.output {
        Some(ref out) => {
            if let Some(parent) = out.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await.with_context(|| {
                        format!("Failed to create output directory {}", parent.display())
                    })?;
                }
            }
            tokio::fs::copy(&report.pdf_path, out)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            out.clone()
        }
        None => {
            let out = cli.input.with_extension("pdf");
            tokio::fs::copy(&report.pdf_path, &out)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;
            out
        }
    };

    if !cli.keep_workdir {
        let _ = tokio::fs::remove_dir_all(
            report
                .pdf_path
                .parent()
                .unwrap_or_else(|| std::path::Path::new(".")),
        )
        .await;
    }

    if cli.json {
        println!(
            "{}",
            serde_json::json!({
                "session_id": report.session_id,
                "report_type": report_type.as_str(),
                "pdf_path": final_path,
            })
        );
    } else if !cli.quiet {
        eprintln!("✔ {}", final_path.display());
    }

    Ok(())
}
