//! Markup extraction: drive the document converter over an uploaded file.
//!
//! ## Why shell out?
//!
//! Faithful docx parsing (styles, numbering, embedded OLE math, images) is a
//! moving target that pandoc already solves. We invoke it as an external
//! process with `--extract-media` so embedded images land in the session's
//! `media/` folder, and capture the GitHub-flavoured Markdown on stdout.
//! Running with the session directory as the working directory keeps every
//! intermediate file inside the session's exclusive sandbox and keeps the
//! emitted image references relative (`./media/image1.png`).
//!
//! A converter failure here is a [`ReportError::Conversion`] — "could not
//! read your document" — and is deliberately a different variant from the
//! compile stage's errors so callers can report the right thing.

use crate::config::EngineConfig;
use crate::error::ReportError;
use crate::session::{ConversionSession, ImageAsset, MEDIA_DIR};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Raw result of the extraction stage: markup before math normalization,
/// plus the images the converter pulled out of the document.
#[derive(Debug)]
pub struct ExtractedMarkup {
    pub markup: String,
    pub images: Vec<ImageAsset>,
}

/// Convert the document at `document` into markup, extracting embedded
/// images into the session's media folder.
pub async fn extract_markup(
    config: &EngineConfig,
    session: &ConversionSession,
    document: &Path,
) -> Result<ExtractedMarkup, ReportError> {
    if !document.exists() {
        return Err(ReportError::FileNotFound {
            path: document.to_path_buf(),
        });
    }

    info!(
        "Session {}: converting {} to markup",
        session.id(),
        document.display()
    );

    let mut cmd = Command::new(&config.converter_bin);
    cmd.arg(document)
        .args(["-f", "docx", "-t", "gfm", "--extract-media", ".", "-o", "-"])
        .current_dir(session.dir())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let run = tokio::time::timeout(
        std::time::Duration::from_secs(config.convert_timeout_secs),
        cmd.output(),
    )
    .await;

    let output = match run {
        Err(_elapsed) => {
            return Err(ReportError::Conversion {
                detail: format!(
                    "converter timed out after {}s",
                    config.convert_timeout_secs
                ),
            })
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReportError::Environment {
                binary: config.converter_bin.clone(),
                detail: e.to_string(),
            })
        }
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ReportError::PermissionDenied {
                path: document.to_path_buf(),
            })
        }
        Ok(Err(e)) => return Err(ReportError::Internal(format!("spawn converter: {}", e))),
        Ok(Ok(output)) => output,
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ReportError::Conversion {
            detail: first_lines(stderr.trim(), 8),
        });
    }

    let markup = String::from_utf8_lossy(&output.stdout).into_owned();
    if markup.trim().is_empty() {
        return Err(ReportError::Conversion {
            detail: "converter produced no output".into(),
        });
    }

    let images = collect_media(session);
    info!(
        "Session {}: extracted {} bytes of markup, {} images",
        session.id(),
        markup.len(),
        images.len()
    );

    Ok(ExtractedMarkup { markup, images })
}

/// Walk the session's media folder and describe each extracted image.
///
/// The converter preserves the document-internal layout, so files may sit in
/// nested folders; the reference name is always folder-qualified with the
/// flat `media/` prefix the markup uses.
fn collect_media(session: &ConversionSession) -> Vec<ImageAsset> {
    let media = session.media_dir();
    if !media.is_dir() {
        return Vec::new();
    }

    let mut images: Vec<ImageAsset> = WalkDir::new(&media)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            debug!("Found extracted asset: {}", entry.path().display());
            ImageAsset {
                path: entry.path().to_path_buf(),
                reference: format!("{}/{}", MEDIA_DIR, name),
                address: None,
            }
        })
        .collect();

    // Stable order so batch outcomes are deterministic across runs.
    images.sort_by(|a, b| a.reference.cmp(&b.reference));
    images
}

/// Keep at most the first `n` lines of a diagnostic blob.
fn first_lines(s: &str, n: usize) -> String {
    let mut lines: Vec<&str> = s.lines().take(n + 1).collect();
    if lines.len() > n {
        lines.truncate(n);
        lines.push("…");
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn collect_media_flattens_nested_folders() {
        let root = TempDir::new().unwrap();
        let session = ConversionSession::create(root.path(), "s-1").unwrap();
        let nested = session.media_dir().join("media");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("image1.png"), b"png").unwrap();
        std::fs::write(session.media_dir().join("chart.png"), b"png").unwrap();

        let images = collect_media(&session);
        let refs: Vec<&str> = images.iter().map(|a| a.reference.as_str()).collect();
        assert_eq!(refs, vec!["media/chart.png", "media/image1.png"]);
        assert!(images.iter().all(|a| a.address.is_none()));
    }

    #[test]
    fn collect_media_empty_when_no_folder() {
        let root = TempDir::new().unwrap();
        let session = ConversionSession::create(root.path(), "s-2").unwrap();
        assert!(collect_media(&session).is_empty());
    }

    #[tokio::test]
    async fn missing_document_is_file_not_found() {
        let root = TempDir::new().unwrap();
        let session = ConversionSession::create(root.path(), "s-3").unwrap();
        let config = EngineConfig::default();
        let err = extract_markup(&config, &session, Path::new("/no/such/file.docx"))
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn missing_converter_is_environment_error() {
        let root = TempDir::new().unwrap();
        let session = ConversionSession::create(root.path(), "s-4").unwrap();
        let doc = root.path().join("doc.docx");
        std::fs::write(&doc, b"PK").unwrap();

        let config = EngineConfig::builder()
            .converter_bin("definitely-not-a-real-converter-binary")
            .build()
            .unwrap();
        let err = extract_markup(&config, &session, &doc).await.unwrap_err();
        assert!(matches!(err, ReportError::Environment { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn conversion_timeout_is_conversion_error() {
        let root = TempDir::new().unwrap();
        let session = ConversionSession::create(root.path(), "s-5").unwrap();
        let doc = root.path().join("doc.docx");
        std::fs::write(&doc, b"PK").unwrap();

        // Stands in for a converter wedged on a corrupt document.
        let shim = root.path().join("slow-converter");
        std::fs::write(&shim, "#!/bin/sh\nsleep 30\n").unwrap();
        let mut perm = std::fs::metadata(&shim).unwrap().permissions();
        use std::os::unix::fs::PermissionsExt;
        perm.set_mode(0o755);
        std::fs::set_permissions(&shim, perm).unwrap();

        let config = EngineConfig::builder()
            .converter_bin(shim.to_string_lossy().to_string())
            .convert_timeout_secs(1)
            .build()
            .unwrap();

        let err = extract_markup(&config, &session, &doc).await.unwrap_err();
        assert!(matches!(err, ReportError::Conversion { .. }));
        assert!(err.to_string().contains("timed out after 1s"));
    }

    #[test]
    fn first_lines_truncates() {
        let blob = (0..20).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let cut = first_lines(&blob, 3);
        assert_eq!(cut, "line0\nline1\nline2\n…");
        assert_eq!(first_lines("short", 3), "short");
    }
}
