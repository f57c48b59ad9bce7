//! Asset relocation: move extracted images to the object store and rewrite
//! their markup references to the store's public addresses.
//!
//! ## Partial failure is the normal case
//!
//! One flaky upload must not abort the batch: the failed image keeps its
//! local reference (the markup stays valid, just with an unresolvable link)
//! and every other image is still relocated. Outcomes are modelled as a
//! result-per-asset collected into a [`RelocationReport`], not as
//! control-flow exceptions.
//!
//! ## Reference rewriting
//!
//! The converter is not contractually precise about how it spells image
//! references — folder-qualified (`media/img1.png`, `./media/img1.png`) and
//! bare (`img1.png`) forms both occur. Rewriting therefore matches any
//! Markdown link target whose final path segment is exactly the asset's
//! file name, delimited by the surrounding parentheses. Anchoring on the
//! `(`-or-`/` boundary is what makes `img1.png` safe against being found
//! inside `big-img1.png`: plain substring replacement would corrupt it.

use crate::config::EngineConfig;
use crate::error::AssetError;
use crate::session::ImageAsset;
use crate::store::ObjectStore;
use futures::stream::{self, StreamExt};
use regex::Regex;
use serde::Serialize;
use tracing::{info, warn};

/// How many uploads are in flight at once per session. Uploads are
/// network-bound; a small fan-out hides latency without hammering the store.
const UPLOAD_CONCURRENCY: usize = 4;

/// Result for a single asset in a relocation batch.
#[derive(Debug, Clone, Serialize)]
pub enum RelocationOutcome {
    /// Uploaded and rewritten; `address` is the public address now embedded
    /// in the markup.
    Uploaded { file: String, address: String },
    /// Upload failed; the local reference was left untouched.
    Failed { file: String, error: AssetError },
}

/// Outcome of relocating one session's asset batch.
#[derive(Debug)]
pub struct RelocationReport {
    /// Markup with every successfully relocated reference rewritten.
    pub markup: String,
    /// One outcome per asset, in the batch's deterministic order.
    pub outcomes: Vec<RelocationOutcome>,
}

impl RelocationReport {
    pub fn uploaded_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RelocationOutcome::Uploaded { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.uploaded_count()
    }
}

/// Upload every asset and rewrite its markup reference to the returned
/// address. Assets that fail keep `address = None` and their local
/// reference; the batch always completes.
pub async fn relocate_assets(
    store: &dyn ObjectStore,
    config: &EngineConfig,
    session_id: &str,
    assets: &mut [ImageAsset],
    markup: &str,
) -> RelocationReport {
    // Upload phase: concurrent, indexed so results can be applied in order.
    let uploads: Vec<(usize, Result<String, AssetError>)> =
        stream::iter(assets.iter().enumerate().map(|(idx, asset)| {
            let file = asset.file_name().to_string();
            let key = format!(
                "{}/{}/{}/{}",
                config.asset_key_prefix,
                session_id,
                crate::session::MEDIA_DIR,
                file
            );
            let path = asset.path.clone();
            async move {
                // A vanished or unreadable extracted file is the asset's
                // problem, not the store's; report it as such.
                let result = match tokio::fs::metadata(&path).await {
                    Err(e) => Err(AssetError::Unreadable {
                        name: file.clone(),
                        detail: e.to_string(),
                    }),
                    Ok(_) => store.put(&path, &key).await.map_err(|e| {
                        AssetError::UploadFailed {
                            name: file.clone(),
                            detail: e.to_string(),
                        }
                    }),
                };
                (idx, result)
            }
        }))
        .buffer_unordered(UPLOAD_CONCURRENCY)
        .collect()
        .await;

    // Apply phase: sequential and ordered, so the rewritten markup and the
    // outcome list are deterministic regardless of upload completion order.
    let mut results: Vec<Option<Result<String, AssetError>>> =
        (0..assets.len()).map(|_| None).collect();
    for (idx, result) in uploads {
        results[idx] = Some(result);
    }

    let mut markup = markup.to_string();
    let mut outcomes = Vec::with_capacity(assets.len());

    for (asset, result) in assets.iter_mut().zip(results) {
        let file = asset.file_name().to_string();
        match result.expect("every asset yields exactly one upload result") {
            Ok(address) => {
                markup = rewrite_reference(&markup, &file, &address);
                asset.address = Some(address.clone());
                outcomes.push(RelocationOutcome::Uploaded { file, address });
            }
            Err(error) => {
                warn!("Session {}: {}", session_id, error);
                outcomes.push(RelocationOutcome::Failed { file, error });
            }
        }
    }

    info!(
        "Session {}: relocated {}/{} assets",
        session_id,
        outcomes
            .iter()
            .filter(|o| matches!(o, RelocationOutcome::Uploaded { .. }))
            .count(),
        outcomes.len()
    );

    RelocationReport { markup, outcomes }
}

/// Replace every Markdown link target resolving to `file_name` with
/// `address`.
///
/// Matches `(file.png)`, `(media/file.png)`, `(./media/file.png)` and any
/// deeper folder qualification, but never a longer file name that merely
/// ends with the same characters.
pub fn rewrite_reference(markup: &str, file_name: &str, address: &str) -> String {
    let pattern = format!(r"\(([^()\s]*/)?{}\)", regex::escape(file_name));
    // The pattern is built from a fixed skeleton plus an escaped literal;
    // it cannot fail to compile.
    let re = Regex::new(&pattern).expect("reference pattern is well-formed");
    // NoExpand: the address is a literal, not a capture-group template.
    re.replace_all(markup, regex::NoExpand(format!("({})", address).as_str()))
        .into_owned()
}
