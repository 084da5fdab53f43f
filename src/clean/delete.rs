use crate::api::client::DaemonClient;
use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::search::item::{search_item, search_item_offline};
use crate::validation::params::{ClaimRef, CleanTarget};
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, info};

/// What `delete_single` removed
#[derive(Debug, Clone, PartialEq)]
pub struct Deleted {
    pub claim_id: String,
    pub claim_name: String,
    pub blobs_completed: u64,
    pub blobs_in_stream: u64,
    /// Media file that was removed from disk
    pub media_removed: Option<PathBuf>,
    /// The daemon dropped the blobs
    pub blobs_removed: bool,
}

/// `file_delete`, also removing the media file for `Both`
pub async fn lbrynet_del(daemon: &DaemonClient, claim_id: &str, target: CleanTarget) -> Outcome<()> {
    let mut params = json!({ "claim_id": claim_id });
    if target == CleanTarget::Both {
        params["delete_from_download_dir"] = json!(true);
    }

    daemon.call_value("file_delete", params).await?;
    info!(claim_id, ?target, "Blobs deleted");
    Ok(())
}

/// Remove the media file, the blobs, or both, of a downloaded claim.
///
/// With `invalid`, the claim is looked up locally since it no longer
/// resolves online. A claim with no local record gives `NotFound`.
pub async fn delete_single(session: &Session, claim: &ClaimRef, invalid: bool, target: CleanTarget) -> Outcome<Deleted> {
    let claim_id = if invalid {
        search_item_offline(&session.daemon, claim).await?.claim_id
    } else {
        search_item(&session.daemon, claim).await?.claim_id
    };

    let local = match search_item_offline(&session.daemon, &ClaimRef::ClaimId(claim_id.clone())).await {
        Ok(item) => item,
        Err(ToolError::NotFound(_)) => {
            return Err(ToolError::NotFound(format!(
                "no local file for claim_id={claim_id}, probably already deleted"
            )))
        }
        Err(e) => return Err(e),
    };

    debug!(
        claim_id = %claim_id,
        blobs = local.blobs_completed,
        of = local.blobs_in_stream,
        "Found local claim"
    );

    let mut deleted = Deleted {
        claim_id: claim_id.clone(),
        claim_name: local.claim_name.clone(),
        blobs_completed: local.blobs_completed,
        blobs_in_stream: local.blobs_in_stream,
        media_removed: None,
        blobs_removed: false,
    };

    match target {
        CleanTarget::Media => {
            deleted.media_removed = remove_media_file(local.download_path)?;
        }
        CleanTarget::Blobs | CleanTarget::Both => {
            lbrynet_del(&session.daemon, &claim_id, target).await?;
            deleted.blobs_removed = true;
            if target == CleanTarget::Both {
                deleted.media_removed = local.download_path;
            }
        }
    }

    Ok(deleted)
}

/// Delete a media file if it is still on disk
pub(crate) fn remove_media_file(path: Option<PathBuf>) -> Outcome<Option<PathBuf>> {
    match path {
        Some(path) if path.is_file() => {
            std::fs::remove_file(&path).map_err(|e| ToolError::io(&path, e))?;
            info!(path = %path.display(), "Media file deleted");
            Ok(Some(path))
        }
        _ => {
            debug!("No media found locally, probably already deleted");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_session;
    use crate::testing::{ok, stream_claim, FakeServer};
    use serde_json::Value;

    const CID: &str = "70dfefa510ca6eee7023a2a927e34d385b5a18bd";

    async fn server_with_media(path: Option<String>) -> FakeServer {
        FakeServer::spawn(move |method, _| match method {
            "claim_search" => ok(json!({"items": [stream_claim(CID, "video", "sd")]})),
            "file_list" => ok(json!({"items": [{
                "claim_id": CID,
                "claim_name": "video",
                "download_path": path,
                "blobs_completed": 4,
                "blobs_in_stream": 5
            }]})),
            "file_delete" => ok(json!(true)),
            _ => ok(Value::Null),
        })
        .await
    }

    #[tokio::test]
    async fn test_media_only_keeps_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("video.mp4");
        std::fs::write(&media, b"data").unwrap();

        let server = server_with_media(Some(media.to_string_lossy().to_string())).await;
        let session = test_session(&server.url);

        let deleted = delete_single(&session, &ClaimRef::ClaimId(CID.to_string()), false, CleanTarget::Media)
            .await
            .unwrap();

        assert_eq!(deleted.media_removed.as_deref(), Some(media.as_path()));
        assert!(!deleted.blobs_removed);
        assert!(!media.exists());
        assert!(!server.methods().contains(&"file_delete".to_string()));
    }

    #[tokio::test]
    async fn test_both_asks_daemon_to_remove_file() {
        let server = server_with_media(None).await;
        let session = test_session(&server.url);

        let deleted = delete_single(&session, &ClaimRef::ClaimId(CID.to_string()), false, CleanTarget::Both)
            .await
            .unwrap();

        assert!(deleted.blobs_removed);
        let (method, params) = server.calls().last().cloned().unwrap();
        assert_eq!(method, "file_delete");
        assert_eq!(params["delete_from_download_dir"], true);
    }

    #[tokio::test]
    async fn test_blobs_only() {
        let server = server_with_media(None).await;
        let session = test_session(&server.url);

        delete_single(&session, &ClaimRef::ClaimId(CID.to_string()), true, CleanTarget::Blobs)
            .await
            .unwrap();

        assert_eq!(server.methods(), vec!["file_list", "file_list", "file_delete"]);
        assert!(server.calls()[2].1.get("delete_from_download_dir").is_none());
    }

    #[tokio::test]
    async fn test_not_downloaded() {
        let server = FakeServer::spawn(|method, _| match method {
            "claim_search" => ok(json!({"items": [stream_claim(CID, "video", "sd")]})),
            _ => ok(json!({"items": [], "total_items": 0})),
        })
        .await;
        let session = test_session(&server.url);

        let err = delete_single(&session, &ClaimRef::ClaimId(CID.to_string()), false, CleanTarget::Media)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
