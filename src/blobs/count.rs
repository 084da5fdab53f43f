use crate::clean::delete::delete_single;
use crate::core::error::{Outcome, ToolError};
use crate::core::state::Session;
use crate::download::single::{download_single, DownloadOptions};
use crate::models::blob::{BlobInfo, BlobState, SdBlob};
use crate::search::item::search_item;
use crate::search::sort::sort_items;
use crate::validation::params::{ClaimRef, CleanTarget};
use std::path::Path;
use tracing::{debug, info, warn};

/// Check which blobs of a claim are in the blob directory, reading the
/// list of blobs from the locally stored manifest.
///
/// A manifest that is not on disk gives `NotFound`; the claim has to be
/// downloaded again.
pub async fn count_blobs(session: &Session, claim: &ClaimRef, blob_dir: &Path) -> Outcome<BlobInfo> {
    let item = search_item(&session.daemon, claim).await?;

    let sd_hash = item
        .sd_hash()
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidInput(format!("{} is not a stream", item.short_canonical())))?;

    let sd_path = blob_dir.join(&sd_hash);
    if !sd_path.exists() {
        return Err(ToolError::NotFound(format!(
            "sd_hash blob {sd_hash} not in {}, redownload the claim",
            blob_dir.display()
        )));
    }

    let content = std::fs::read_to_string(&sd_path).map_err(|e| ToolError::io(&sd_path, e))?;
    let manifest: SdBlob = serde_json::from_str(&content).map_err(|e| {
        ToolError::InvalidInput(format!("unreadable manifest {}: {e}", sd_path.display()))
    })?;

    let blobs: Vec<BlobState> = manifest
        .data_blobs()
        .map(|(num, hash)| BlobState {
            num,
            hash: hash.to_string(),
            present: blob_dir.join(hash).exists(),
        })
        .collect();
    let missing: Vec<BlobState> = blobs.iter().filter(|b| !b.present).cloned().collect();

    debug!(claim_id = %item.claim_id, blobs = blobs.len(), missing = missing.len(), "Blobs counted");

    Ok(BlobInfo {
        canonical_url: item.canonical_url.clone().unwrap_or_default(),
        claim_id: item.claim_id.clone(),
        sd_hash,
        all_present: missing.is_empty(),
        blobs,
        missing,
    })
}

/// Detail lines for one claim
pub fn blob_info_lines(info: &BlobInfo, print_each: bool) -> Vec<String> {
    let n_blobs = info.blobs.len();
    let mut lines = vec![
        format!("canonical_url: {}", info.canonical_url),
        format!("claim_id: {}", info.claim_id),
        format!("sd_hash: {}", info.sd_hash),
        format!("Total blobs: {n_blobs}"),
    ];

    if print_each {
        lines.extend(
            info.blobs
                .iter()
                .map(|b| format!("{:3}/{:3}, {}, {}", b.num, n_blobs, b.hash, b.present)),
        );
    }

    lines.push(format!("All blob files present: {}", info.all_present));
    lines
}

/// Claims by the state of their blobs
#[derive(Debug, Default)]
pub struct BlobTally {
    pub claims: Vec<(usize, Outcome<BlobInfo>)>,
}

impl BlobTally {
    pub fn complete(&self) -> usize {
        self.count(|r| matches!(r, Ok(info) if info.all_present))
    }

    pub fn incomplete(&self) -> usize {
        self.count(|r| matches!(r, Ok(info) if !info.all_present))
    }

    /// Manifest missing or claim no longer valid
    pub fn missing(&self) -> usize {
        self.count(Result::is_err)
    }

    fn count(&self, pred: impl Fn(&Outcome<BlobInfo>) -> bool) -> usize {
        self.claims.iter().filter(|(_, r)| pred(r)).count()
    }

    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("claims with complete blobs: {}", self.complete()),
            format!("claims with incomplete blobs: {}", self.incomplete()),
            format!("missing: {} ('sd_hash' missing, or invalid claim)", self.missing()),
            "-".repeat(8),
            format!("total claims processed: {}", self.claims.len()),
        ]
    }
}

/// `count_blobs` over the downloaded claims numbered `start..=end`
pub async fn count_blobs_all(session: &Session, blob_dir: &Path, start: usize, end: usize) -> Outcome<BlobTally> {
    let items = sort_items(&session.daemon, None, false).await?;
    let n_items = items.len();
    let mut tally = BlobTally::default();

    for (num, item) in items.iter().enumerate() {
        let it = num + 1;
        if it < start {
            continue;
        }
        if end != 0 && it > end {
            break;
        }

        let result = count_blobs(session, &ClaimRef::ClaimId(item.claim_id.clone()), blob_dir).await;
        match &result {
            Ok(info) => info!(index = it, total = n_items, claim_name = %item.claim_name, all_present = info.all_present, "Counted"),
            Err(e) => warn!(index = it, total = n_items, claim_name = %item.claim_name, error = %e, "Cannot count blobs"),
        }
        tally.claims.push((it, result));
    }

    Ok(tally)
}

/// Download a claim again when some of its blobs are missing. Returns
/// `true` when a download was started.
pub async fn redownload_blobs(
    session: &Session,
    claim: &ClaimRef,
    blob_dir: &Path,
    opts: &DownloadOptions,
) -> Outcome<bool> {
    let info = count_blobs(session, claim, blob_dir).await?;

    if info.all_present {
        info!(claim_id = %info.claim_id, "All blob files present, nothing to download");
        return Ok(false);
    }

    info!(claim_id = %info.claim_id, missing = info.missing.len(), "Blobs missing, downloading again");
    let cid = ClaimRef::ClaimId(info.claim_id.clone());

    // The daemon skips `get` for a stream it considers complete
    match delete_single(session, &cid, false, CleanTarget::Media).await {
        Ok(_) | Err(ToolError::NotFound(_)) => {}
        Err(e) => return Err(e),
    }
    download_single(session, &cid, false, opts).await?;
    Ok(true)
}
