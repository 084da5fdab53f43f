use crate::api::client::DaemonClient;
use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::validation::params::{validate_blob_hash, BlobAction};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Fetch a blob from the network, announce it to the DHT, or both
pub async fn blob_get(daemon: &DaemonClient, blob: &str, action: BlobAction) -> Outcome<()> {
    validate_blob_hash(blob)?;

    if action.gets() {
        debug!(blob, "blob_get");
        daemon.call_value("blob_get", json!({ "blob_hash": blob })).await?;
    }
    if action.announces() {
        debug!(blob, "blob_announce");
        daemon.call_value("blob_announce", json!({ "blob_hash": blob })).await?;
    }

    Ok(())
}

/// Blob directory given on the command line, or the daemon's
pub async fn resolve_blob_dir(session: &Session, dir: Option<&Path>) -> Outcome<PathBuf> {
    match dir {
        Some(dir) if dir.is_dir() => Ok(dir.to_path_buf()),
        Some(dir) => Err(ToolError::InvalidInput(format!(
            "blob directory does not exist: {}",
            dir.display()
        ))),
        None => Ok(session.daemon.settings().await?.blob_dir()),
    }
}

/// File names in the blob directory, sorted
pub fn list_blob_files(blob_dir: &Path) -> Outcome<Vec<String>> {
    let entries = std::fs::read_dir(blob_dir).map_err(|e| ToolError::io(blob_dir, e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ToolError::io(blob_dir, e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Run `action` on the blobs numbered `start..=end` (1-based, `end = 0`
/// for the last) of the blob directory. Failures are logged and counted.
pub async fn blobs_action(
    session: &Session,
    blob_dir: &Path,
    action: BlobAction,
    start: usize,
    end: usize,
) -> Outcome<Vec<Outcome<()>>> {
    let blobs = list_blob_files(blob_dir)?;
    let n_blobs = blobs.len();
    info!(blobs = n_blobs, ?action, dir = %blob_dir.display(), "Blob action");

    let mut results = Vec::new();
    for (num, blob) in blobs.iter().enumerate() {
        let it = num + 1;
        if it < start {
            continue;
        }
        if end != 0 && it > end {
            break;
        }

        debug!(index = it, total = n_blobs, blob, "Blob");
        let result = blob_get(&session.daemon, blob, action).await;
        if let Err(e) = &result {
            warn!(index = it, blob, error = %e, "Blob action failed");
        }
        results.push(result);
    }

    let failed = results.iter().filter(|r| r.is_err()).count();
    info!(processed = results.len(), failed, "Blob action done");
    Ok(results)
}
