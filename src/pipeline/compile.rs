//! PDF compilation: drive the typesetting toolchain over a rendered source.
//!
//! ## Atomic output
//!
//! The typesetter writes to a temporary name inside the session directory;
//! only after a clean exit is the file renamed to `report.pdf`. A failed or
//! timed-out run therefore never leaves a partial or corrupt artifact where
//! a caller could mistake it for the session's result, and a stale PDF from
//! a previous attempt is removed before the run starts.
//!
//! ## Timeout
//!
//! Typesetting is the single long-running stage of the pipeline. The child
//! process is spawned with `kill_on_drop`, so when the timeout elapses and
//! the output future is dropped the process is killed with it — no orphaned
//! LaTeX runs accumulating on the host.

use crate::config::EngineConfig;
use crate::error::ReportError;
use crate::session::ConversionSession;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// File name of the rendered document source inside the session directory.
const SOURCE_NAME: &str = "report.md";
/// File name of the finished artifact.
const OUTPUT_NAME: &str = "report.pdf";
/// Scratch name the typesetter writes to before the atomic rename.
const SCRATCH_NAME: &str = "report.tmp.pdf";

/// Compile the rendered document source into the session's PDF and return
/// its path.
pub async fn compile_pdf(
    config: &EngineConfig,
    session: &ConversionSession,
    source: &str,
) -> Result<PathBuf, ReportError> {
    let source_path = session.dir().join(SOURCE_NAME);
    let scratch_path = session.dir().join(SCRATCH_NAME);
    let output_path = session.dir().join(OUTPUT_NAME);

    tokio::fs::write(&source_path, source)
        .await
        .map_err(|e| ReportError::Io {
            path: source_path.clone(),
            source: e,
        })?;

    // A retry on this session must never expose the previous attempt's
    // artifact while the new run is in flight or after it fails.
    let _ = tokio::fs::remove_file(&scratch_path).await;
    let _ = tokio::fs::remove_file(&output_path).await;

    info!(
        "Session {}: compiling PDF ({} engine, {}s budget)",
        session.id(),
        config.pdf_engine,
        config.compile_timeout_secs
    );

    let mut cmd = Command::new(&config.converter_bin);
    cmd.arg(SOURCE_NAME)
        .args(["-o", SCRATCH_NAME, "--standalone"])
        .arg(format!("--pdf-engine={}", config.pdf_engine))
        .current_dir(session.dir())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let run = tokio::time::timeout(
        std::time::Duration::from_secs(config.compile_timeout_secs),
        cmd.output(),
    )
    .await;

    let output = match run {
        Err(_elapsed) => {
            let _ = tokio::fs::remove_file(&scratch_path).await;
            return Err(ReportError::CompileTimeout {
                secs: config.compile_timeout_secs,
            });
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReportError::Environment {
                binary: config.converter_bin.clone(),
                detail: e.to_string(),
            })
        }
        Ok(Err(e)) => return Err(ReportError::Internal(format!("spawn typesetter: {}", e))),
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let _ = tokio::fs::remove_file(&scratch_path).await;
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReportError::Compilation {
            detail: diagnostic_tail(stderr.trim()),
        });
    }

    if !scratch_path.exists() {
        return Err(ReportError::Compilation {
            detail: "typesetter reported success but produced no output".into(),
        });
    }

    tokio::fs::rename(&scratch_path, &output_path)
        .await
        .map_err(|e| ReportError::Io {
            path: output_path.clone(),
            source: e,
        })?;

    debug!("Session {}: wrote {}", session.id(), output_path.display());
    Ok(output_path)
}

/// Keep the tail of a typesetter log — LaTeX puts the actual error last,
/// after pages of box warnings.
fn diagnostic_tail(log: &str) -> String {
    const MAX_LINES: usize = 20;
    let lines: Vec<&str> = log.lines().collect();
    if lines.len() <= MAX_LINES {
        return log.to_string();
    }
    let mut tail = vec!["…"];
    tail.extend(&lines[lines.len() - MAX_LINES..]);
    tail.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn missing_typesetter_is_environment_error() {
        let root = TempDir::new().unwrap();
        let session = ConversionSession::create(root.path(), "c-1").unwrap();
        let config = EngineConfig::builder()
            .converter_bin("definitely-not-a-real-typesetter-binary")
            .build()
            .unwrap();

        let err = compile_pdf(&config, &session, "# doc").await.unwrap_err();
        assert!(matches!(err, ReportError::Environment { .. }));
        // Nothing half-written left behind.
        assert!(!session.dir().join(OUTPUT_NAME).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_typesetter_is_compilation_error_with_no_artifact() {
        let root = TempDir::new().unwrap();
        let session = ConversionSession::create(root.path(), "c-2").unwrap();
        // `false` exits nonzero without producing output, like a LaTeX error.
        let config = EngineConfig::builder().converter_bin("false").build().unwrap();

        let err = compile_pdf(&config, &session, "# doc").await.unwrap_err();
        assert!(matches!(err, ReportError::Compilation { .. }));
        assert!(err.is_compilation());
        assert!(!session.dir().join(OUTPUT_NAME).exists());
        assert!(!session.dir().join(SCRATCH_NAME).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_run_and_reports_compile_timeout() {
        let root = TempDir::new().unwrap();
        let session = ConversionSession::create(root.path(), "c-3").unwrap();
        // `sleep` stands in for a wedged typesetter; args are ignored noise
        // to it beyond the duration, so give the duration first via a shim.
        let shim = root.path().join("slow-typesetter");
        std::fs::write(&shim, "#!/bin/sh\nsleep 30\n").unwrap();
        let mut perm = std::fs::metadata(&shim).unwrap().permissions();
        use std::os::unix::fs::PermissionsExt;
        perm.set_mode(0o755);
        std::fs::set_permissions(&shim, perm).unwrap();

        let config = EngineConfig::builder()
            .converter_bin(shim.to_string_lossy().to_string())
            .compile_timeout_secs(1)
            .build()
            .unwrap();

        let err = compile_pdf(&config, &session, "# doc").await.unwrap_err();
        assert!(matches!(err, ReportError::CompileTimeout { secs: 1 }));
        assert!(!session.dir().join(OUTPUT_NAME).exists());
    }

    #[test]
    fn diagnostic_tail_keeps_the_end() {
        let log = (0..50).map(|i| format!("l{i}")).collect::<Vec<_>>().join("\n");
        let tail = diagnostic_tail(&log);
        assert!(tail.starts_with("…"));
        assert!(tail.ends_with("l49"));
        assert_eq!(diagnostic_tail("short"), "short");
    }
}
