use serde::{Deserialize, Serialize};

/// Manifest of a stream, stored as the `sd_hash` blob
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SdBlob {
    #[serde(default)]
    pub blobs: Vec<SdEntry>,
    #[serde(default)]
    pub stream_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SdEntry {
    #[serde(default)]
    pub blob_num: u32,
    /// Absent on the zero-length terminator entry
    #[serde(default)]
    pub blob_hash: Option<String>,
    #[serde(default)]
    pub length: u64,
}

impl SdBlob {
    /// Data blobs, without the terminator
    pub fn data_blobs(&self) -> impl Iterator<Item = (u32, &str)> {
        self.blobs
            .iter()
            .filter_map(|b| b.blob_hash.as_deref().map(|h| (b.blob_num, h)))
    }
}

/// One data blob and whether its file is in the blob directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobState {
    pub num: u32,
    pub hash: String,
    pub present: bool,
}

/// Blob files of a claim found on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobInfo {
    pub canonical_url: String,
    pub claim_id: String,
    pub sd_hash: String,
    pub all_present: bool,
    pub blobs: Vec<BlobState>,
    pub missing: Vec<BlobState>,
}
