use crate::models::claim::{lenient_i64, ClaimValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A locally managed stream from `file_list`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileItem {
    pub claim_id: String,
    #[serde(default)]
    pub claim_name: String,
    /// Present only when the media file was saved
    #[serde(default)]
    pub download_path: Option<PathBuf>,
    #[serde(default)]
    pub download_directory: Option<PathBuf>,
    #[serde(default)]
    pub blobs_completed: u64,
    #[serde(default)]
    pub blobs_in_stream: u64,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub sd_hash: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub height: Option<i64>,
    #[serde(default)]
    pub metadata: ClaimValue,
}

impl FileItem {
    /// Release time, or the block timestamp for old claims without one
    pub fn release_time(&self) -> i64 {
        self.metadata
            .release_time
            .or(self.timestamp)
            .unwrap_or(0)
    }

    pub fn has_media(&self) -> bool {
        self.download_path
            .as_ref()
            .map(|p| p.exists())
            .unwrap_or(false)
    }

    pub fn is_complete(&self) -> bool {
        self.blobs_in_stream > 0 && self.blobs_completed >= self.blobs_in_stream
    }
}

/// Result of `get` and `file_save`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DownloadInfo {
    #[serde(default)]
    pub claim_id: String,
    #[serde(default)]
    pub claim_name: String,
    #[serde(default)]
    pub channel_name: Option<String>,
    #[serde(default)]
    pub blobs_completed: u64,
    #[serde(default)]
    pub blobs_in_stream: u64,
    #[serde(default)]
    pub download_path: Option<PathBuf>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub streaming_url: Option<String>,
    /// Set by `get` when the stream could not be fetched
    #[serde(default)]
    pub error: Option<String>,
}

/// Subset of `settings_get`
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub data_dir: PathBuf,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

impl Settings {
    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join("blobfiles")
    }
}
