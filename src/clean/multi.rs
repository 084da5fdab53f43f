use crate::clean::delete::{delete_single, remove_media_file, Deleted};
use crate::clean::space::is_protected;
use crate::core::error::Outcome;
use crate::core::state::Session;
use crate::search::channel::{find_channel, ChannelForm};
use crate::search::claim_file::{load_claim_ids, ClaimSource};
use crate::search::sort::sort_items;
use crate::utils::channels::ChannelSpec;
use crate::validation::params::{ClaimRef, CleanTarget};
use std::path::PathBuf;
use tracing::{error, info, warn};

pub type DeleteBatch = Vec<Outcome<Deleted>>;

/// Delete the oldest downloads of a channel, keeping the newest `keep`
pub async fn ch_cleanup(session: &Session, channel: &str, keep: usize, target: CleanTarget) -> Outcome<DeleteBatch> {
    let items = sort_items(&session.daemon, Some(channel), false).await?;
    let n_items = items.len();
    let to_delete = n_items.saturating_sub(keep);

    let mut results = Vec::with_capacity(to_delete);
    for (num, item) in items.iter().take(to_delete).enumerate() {
        info!(channel, index = num + 1, total = n_items, claim_name = %item.claim_name, "Deleting");
        let result = delete_single(session, &ClaimRef::ClaimId(item.claim_id.clone()), false, target).await;
        if let Err(e) = &result {
            warn!(claim_id = %item.claim_id, error = %e, "Skip delete");
        }
        results.push(result);
    }

    info!(channel, remaining = n_items - to_delete, "Finished deleting");
    Ok(results)
}

/// `ch_cleanup` for several channels, each keeping its own count
pub async fn ch_cleanup_multi(
    session: &Session,
    channels: Vec<ChannelSpec>,
    target: CleanTarget,
) -> Vec<Outcome<DeleteBatch>> {
    let n_channels = channels.len();
    let mut results = Vec::with_capacity(n_channels);

    for (num, spec) in channels.iter().enumerate() {
        info!(index = num + 1, total = n_channels, channel = %spec.channel, keep = spec.number, "Channel");

        let result = ch_cleanup(session, &spec.channel, spec.number, target).await;
        if let Err(e) = &result {
            error!(channel = %spec.channel, error = %e, "Channel cleanup failed");
        }
        results.push(result);
    }

    results
}

/// Delete every downloaded media file but keep the blobs, so the content
/// keeps seeding. Returns the files that were removed.
pub async fn remove_media(session: &Session, never_delete: &[String]) -> Outcome<Vec<PathBuf>> {
    let items = sort_items(&session.daemon, None, false).await?;
    let n_items = items.len();
    let mut removed = Vec::new();

    for (num, item) in items.into_iter().enumerate() {
        if !never_delete.is_empty() {
            let claim = ClaimRef::ClaimId(item.claim_id.clone());
            match find_channel(&session.daemon, &claim, ChannelForm::Short, false).await {
                Ok(channel) if is_protected(&channel, never_delete) => {
                    info!(index = num + 1, total = n_items, claim_name = %item.claim_name, channel, "Protected channel, skipping");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(claim_id = %item.claim_id, error = %e, "Channel unknown, skipping");
                    continue;
                }
            }
        }

        if let Some(path) = remove_media_file(item.download_path)? {
            info!(index = num + 1, total = n_items, path = %path.display(), "Media deleted");
            removed.push(path);
        }
    }

    info!(removed = removed.len(), "Media files deleted");
    Ok(removed)
}

/// Delete the claims numbered `start..=end` (1-based, `end = 0` for the
/// last) from local files or from a claim file
pub async fn remove_claims(
    session: &Session,
    source: &ClaimSource,
    start: usize,
    end: usize,
    invalid: bool,
    target: CleanTarget,
) -> Outcome<DeleteBatch> {
    let claim_ids = load_claim_ids(&session.daemon, source).await?;
    let n_items = claim_ids.len();
    let mut results = Vec::new();

    for (num, cid) in claim_ids.iter().enumerate() {
        let it = num + 1;
        if it < start {
            continue;
        }
        if end != 0 && it > end {
            break;
        }

        info!(index = it, total = n_items, claim_id = %cid, "Deleting");
        let result = delete_single(session, &ClaimRef::ClaimId(cid.clone()), invalid, target).await;
        if let Err(e) = &result {
            warn!(claim_id = %cid, error = %e, "Skip delete");
        }
        results.push(result);
    }

    Ok(results)
}
