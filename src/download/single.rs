use crate::api::client::DaemonClient;
use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::models::claim::{strip_scheme, Claim};
use crate::models::file_item::{DownloadInfo, FileItem};
use crate::search::channel::{resolve_channel, UNKNOWN_CHANNEL};
use crate::search::item::{search_item, search_item_offline};
use crate::utils::time::{format_utc, TFMT};
use crate::validation::params::ClaimRef;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where and how a claim is downloaded
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Download directory; missing or nonexistent means the home directory
    pub ddir: Option<PathBuf>,
    /// Place each claim in a subdirectory named after its channel
    pub own_dir: bool,
    /// Write the media file; otherwise only the blobs are fetched
    pub save_file: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            ddir: None,
            own_dir: true,
            save_file: true,
        }
    }
}

/// The requested download directory if it exists, else the home directory
pub fn resolve_ddir(ddir: Option<&Path>) -> PathBuf {
    match ddir {
        Some(dir) if dir.is_dir() => dir.to_path_buf(),
        other => {
            let home = home::home_dir().unwrap_or_else(|| PathBuf::from("."));
            if let Some(dir) = other {
                warn!(requested = %dir.display(), using = %home.display(), "Download directory does not exist");
            }
            home
        }
    }
}

/// `@name#abc` becomes the directory name `@name_abc`
pub fn channel_dir_name(channel: &str) -> String {
    strip_scheme(channel).replace('#', "_")
}

fn ensure_subdir(ddir: &Path, channel: &str) -> Outcome<PathBuf> {
    let subdir = ddir.join(channel_dir_name(channel));
    std::fs::create_dir_all(&subdir).map_err(|e| ToolError::io(&subdir, e))?;
    Ok(subdir)
}

fn check_download(claim: &str, info: DownloadInfo) -> Outcome<DownloadInfo> {
    if let Some(error) = &info.error {
        return Err(ToolError::Download {
            claim: claim.to_string(),
            reason: error.clone(),
        });
    }
    if info.blobs_in_stream == 0 {
        return Err(ToolError::Download {
            claim: claim.to_string(),
            reason: format!(
                "blobs_in_stream=0, download_path={}",
                info.download_path.as_deref().map_or("None".into(), |p| p.display().to_string())
            ),
        });
    }
    Ok(info)
}

/// `get` a claim by URI.
///
/// Without `save_file` the daemon only fetches the manifest, so the
/// streaming URL is read to pull the remaining blobs.
pub async fn lbrynet_get(daemon: &DaemonClient, uri: &str, ddir: &Path, save_file: bool) -> Outcome<DownloadInfo> {
    info!(uri, ddir = %ddir.display(), save_file, "Download");

    let info: DownloadInfo = daemon
        .call(
            "get",
            json!({
                "uri": uri,
                "download_directory": ddir.to_string_lossy(),
                "save_file": save_file,
            }),
        )
        .await?;

    if !save_file {
        match info.streaming_url.as_deref() {
            Some(url) => {
                let bytes = daemon.stream(url).await?;
                debug!(uri, bytes, "Streamed blobs");
            }
            None => {
                return Err(ToolError::Download {
                    claim: uri.to_string(),
                    reason: "no streaming_url, only the first blob was downloaded".to_string(),
                })
            }
        }
    }

    check_download(uri, info)
}

/// `file_save` a claim that is known locally, recreating its media file
/// from the stored blobs
pub async fn lbrynet_save(daemon: &DaemonClient, claim_id: &str, ddir: &Path) -> Outcome<DownloadInfo> {
    info!(claim_id, ddir = %ddir.display(), "Save from local blobs");

    let info: DownloadInfo = daemon
        .call(
            "file_save",
            json!({
                "claim_id": claim_id,
                "download_directory": ddir.to_string_lossy(),
            }),
        )
        .await?;

    check_download(claim_id, info)
}

/// Download one claim.
///
/// With `invalid`, the claim is looked up in the local database and its
/// media file is recreated from blobs, since it no longer resolves online.
pub async fn download_single(
    session: &Session,
    claim: &ClaimRef,
    invalid: bool,
    opts: &DownloadOptions,
) -> Outcome<DownloadInfo> {
    let ddir = resolve_ddir(opts.ddir.as_deref());

    if invalid && !matches!(claim, ClaimRef::Uri(_)) {
        return download_invalid(session, claim, &ddir, opts.own_dir).await;
    }

    let item = search_item(&session.daemon, claim).await?;
    for line in info_pre_get(&item) {
        debug!("{line}");
    }

    if item.value_type.as_deref() == Some("collection") {
        return Err(ToolError::InvalidInput(format!(
            "{} is a collection; download its claims individually",
            item.short_canonical()
        )));
    }

    let channel = match item.channel_name() {
        Some(channel) => {
            // The daemon lists files by channel only after resolving it
            if let Err(e) = resolve_channel(&session.daemon, &channel).await {
                warn!(channel = %channel, error = %e, "Could not resolve channel");
            }
            channel
        }
        None => UNKNOWN_CHANNEL.to_string(),
    };

    let ddir = if opts.own_dir {
        ensure_subdir(&ddir, &channel)?
    } else {
        ddir
    };

    let uri = item.canonical_url.clone().unwrap_or_else(|| item.name.clone());
    lbrynet_get(&session.daemon, &uri, &ddir, opts.save_file).await
}

async fn download_invalid(session: &Session, claim: &ClaimRef, ddir: &Path, own_dir: bool) -> Outcome<DownloadInfo> {
    let item = search_item_offline(&session.daemon, claim).await?;
    for line in info_pre_get_offline(&item) {
        debug!("{line}");
    }

    let ddir = if own_dir {
        let channel = item.channel_name.clone().unwrap_or_else(|| UNKNOWN_CHANNEL.to_string());
        ensure_subdir(ddir, &channel)?
    } else {
        ddir.to_path_buf()
    };

    lbrynet_save(&session.daemon, &item.claim_id, &ddir).await
}

const BLANK_14: &str = "______________";
const BLANK_8: &str = "________";

/// Details of a claim before downloading it
pub fn info_pre_get(claim: &Claim) -> Vec<String> {
    let value = &claim.value;
    let create_time = format_utc(claim.meta.creation_timestamp.unwrap_or(0), TFMT);
    let rels_time = value
        .release_time
        .filter(|t| *t != 0)
        .map_or_else(|| BLANK_14.to_string(), |t| format_utc(t, TFMT));
    let duration = value.duration();
    let media_type = value
        .source
        .as_ref()
        .and_then(|s| s.media_type.as_deref())
        .unwrap_or(BLANK_14);

    vec![
        format!("canonical_url: {}", claim.canonical_url.as_deref().unwrap_or_default()),
        format!("claim_id: {}", claim.claim_id),
        format!("address: {}", claim.address.as_deref().unwrap_or(BLANK_14)),
        format!("title: {}", value.title.as_deref().unwrap_or("(no title)")),
        format!("creation_timestamp: {create_time}"),
        format!("release_time:       {rels_time}"),
        format!("amount: {}", claim.amount.map_or_else(|| BLANK_8.to_string(), |a| a.to_string())),
        format!(
            "effective_amount: {}",
            claim.meta.effective_amount.map_or_else(|| BLANK_8.to_string(), |a| a.to_string())
        ),
        format!("value_type:  {}", claim.value_type.as_deref().unwrap_or(BLANK_14)),
        format!("stream_type: {}", value.stream_type.as_deref().unwrap_or(BLANK_14)),
        format!("media_type:  {media_type}"),
        format!("duration: {} min {} s", duration / 60, duration % 60),
        format!("size: {:.4} MB", value.size() as f64 / 1024.0 / 1024.0),
    ]
}

/// Details of a locally stored claim before saving it again
pub fn info_pre_get_offline(item: &FileItem) -> Vec<String> {
    let value = &item.metadata;
    let rels_time = value
        .release_time
        .filter(|t| *t != 0)
        .map_or_else(|| BLANK_14.to_string(), |t| format_utc(t, TFMT));
    let duration = value.duration();

    vec![
        format!("claim_name: {}", item.claim_name),
        format!("claim_id: {}", item.claim_id),
        format!("address: {BLANK_14}"),
        format!("title: {}", value.title.as_deref().unwrap_or("(no title)")),
        format!("creation_timestamp: {BLANK_14}"),
        format!("release_time:       {rels_time}"),
        format!("amount: {BLANK_8}"),
        format!("effective_amount: {BLANK_8}"),
        "value_type:  stream".to_string(),
        format!("stream_type: {}", value.stream_type.as_deref().unwrap_or(BLANK_14)),
        format!("media_type:  {}", item.mime_type.as_deref().unwrap_or(BLANK_14)),
        format!("duration: {} min {} s", duration / 60, duration % 60),
        format!("size: {:.4} MB", value.size() as f64 / 1024.0 / 1024.0),
    ]
}

/// Status of a finished download
pub fn info_post_get(info: &DownloadInfo) -> Vec<String> {
    vec![
        format!("blobs_completed: {}", info.blobs_completed),
        format!("blobs_in_stream: {}", info.blobs_in_stream),
        format!(
            "download_path: {}",
            info.download_path.as_deref().map_or("None".into(), |p| p.display().to_string())
        ),
        format!("completed: {}", info.completed),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::test_session;
    use crate::testing::{ok, stream_claim, FakeServer};
    use serde_json::Value;

    const CID: &str = "70dfefa510ca6eee7023a2a927e34d385b5a18bd";

    fn handler(method: &str, params: &Value) -> Value {
        match method {
            "claim_search" => ok(json!({"items": [stream_claim(CID, "video", "sd")]})),
            "resolve" => {
                let uri = params["urls"].as_str().unwrap_or_default().to_string();
                ok(json!({ uri: {"claim_id": "1111", "canonical_url": "lbry://@chan#1"} }))
            }
            "get" | "file_save" => ok(json!({
                "claim_id": CID,
                "claim_name": "video",
                "channel_name": "@chan",
                "blobs_completed": 3,
                "blobs_in_stream": 3,
                "download_path": format!("{}/video.mp4", params["download_directory"].as_str().unwrap_or_default()),
                "completed": true
            })),
            "file_list" => ok(json!({"items": [{
                "claim_id": CID,
                "claim_name": "video",
                "channel_name": "@old#9",
                "metadata": {}
            }]})),
            _ => ok(Value::Null),
        }
    }

    #[tokio::test]
    async fn test_download_into_channel_dir() {
        let server = FakeServer::spawn(handler).await;
        let session = test_session(&server.url);
        let dir = tempfile::tempdir().unwrap();
        let opts = DownloadOptions {
            ddir: Some(dir.path().to_path_buf()),
            ..DownloadOptions::default()
        };

        let info = download_single(&session, &ClaimRef::ClaimId(CID.to_string()), false, &opts)
            .await
            .unwrap();

        assert!(info.completed);
        assert!(dir.path().join("@chan_1").is_dir());

        let (method, params) = server.calls().last().cloned().unwrap();
        assert_eq!(method, "get");
        assert_eq!(params["uri"], "lbry://@chan#1/video#7");
        assert_eq!(params["save_file"], true);
        assert_eq!(
            params["download_directory"],
            dir.path().join("@chan_1").to_string_lossy().as_ref()
        );
    }

    #[tokio::test]
    async fn test_invalid_claim_saved_from_blobs() {
        let server = FakeServer::spawn(handler).await;
        let session = test_session(&server.url);
        let dir = tempfile::tempdir().unwrap();
        let opts = DownloadOptions {
            ddir: Some(dir.path().to_path_buf()),
            ..DownloadOptions::default()
        };

        download_single(&session, &ClaimRef::ClaimId(CID.to_string()), true, &opts)
            .await
            .unwrap();

        assert_eq!(server.methods(), vec!["file_list", "file_save"]);
        assert!(dir.path().join("@old_9").is_dir());
    }

    #[tokio::test]
    async fn test_get_error_is_reported() {
        let server = FakeServer::spawn(|_, _| ok(json!({"error": "Failed to download sd blob"}))).await;
        let daemon = DaemonClient::new(&server.url, 5).unwrap();

        let err = lbrynet_get(&daemon, "lbry://x", Path::new("/tmp"), true).await.unwrap_err();
        assert!(matches!(err, ToolError::Download { .. }));
        assert!(err.to_string().contains("sd blob"));
    }

    #[test]
    fn test_missing_ddir_falls_back() {
        let dir = resolve_ddir(Some(Path::new("/no/such/dir")));
        assert_ne!(dir, PathBuf::from("/no/such/dir"));

        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(resolve_ddir(Some(tmp.path())), tmp.path());
    }

    #[test]
    fn test_channel_dir_name() {
        assert_eq!(channel_dir_name("lbry://@chan#1a"), "@chan_1a");
        assert_eq!(channel_dir_name("@_Unknown_"), "@_Unknown_");
    }

    #[test]
    fn test_pre_and_post_lines() {
        let claim: Claim = serde_json::from_value(stream_claim(CID, "video", "sd")).unwrap();
        let lines = info_pre_get(&claim);
        assert_eq!(lines[0], "canonical_url: lbry://@chan#1/video#7");
        assert_eq!(lines[5], "release_time:       2020-09-13_12:26:40+0000 Sunday");
        assert_eq!(lines[10], "media_type:  video/mp4");
        assert_eq!(lines[11], "duration: 1 min 30 s");
        assert_eq!(lines[12], "size: 1.0000 MB");

        let info = DownloadInfo {
            blobs_completed: 2,
            blobs_in_stream: 5,
            ..Default::default()
        };
        assert_eq!(info_post_get(&info)[2], "download_path: None");
    }
}
