use crate::core::error::Outcome;
use crate::core::state::Session;
use crate::download::single::{download_single, info_post_get, DownloadOptions};
use crate::models::file_item::DownloadInfo;
use crate::search::channel::ch_search_latest;
use crate::search::claim_file::{load_claim_ids, ClaimSource};
use crate::search::sort::sort_items;
use crate::utils::channels::ChannelSpec;
use crate::validation::params::ClaimRef;
use rand::seq::SliceRandom;
use tracing::{error, info, warn};

/// Per-claim results of a batch, in processing order
pub type BatchResult = Vec<Outcome<DownloadInfo>>;

fn log_result(num: usize, total: usize, claim: &str, result: &Outcome<DownloadInfo>) {
    match result {
        Ok(info) => {
            for line in info_post_get(info) {
                info!(index = num, total, "{line}");
            }
        }
        Err(e) => warn!(index = num, total, claim, error = %e, "Skip download"),
    }
}

/// Download the newest `number` claims of a channel. A claim that fails
/// does not stop the others.
pub async fn ch_download_latest(
    session: &Session,
    channel: &str,
    number: usize,
    opts: &DownloadOptions,
) -> Outcome<BatchResult> {
    let items = ch_search_latest(&session.daemon, channel, number).await?;
    let n_items = items.len();
    let mut results = Vec::with_capacity(n_items);

    for (num, item) in items.iter().enumerate() {
        info!(channel, index = num + 1, total = n_items, claim_id = %item.claim_id, "Claim");

        let result = download_single(session, &ClaimRef::ClaimId(item.claim_id.clone()), false, opts).await;
        log_result(num + 1, n_items, &item.claim_id, &result);
        results.push(result);
    }

    Ok(results)
}

/// `ch_download_latest` for several channels, one after the other
pub async fn ch_download_latest_multi(
    session: &Session,
    channels: Vec<ChannelSpec>,
    opts: &DownloadOptions,
) -> Vec<Outcome<BatchResult>> {
    let n_channels = channels.len();
    let mut results = Vec::with_capacity(n_channels);

    for (num, spec) in channels.iter().enumerate() {
        info!(index = num + 1, total = n_channels, channel = %spec.channel, "Channel");

        let result = ch_download_latest(session, &spec.channel, spec.number, opts).await;
        if let Err(e) = &result {
            error!(channel = %spec.channel, error = %e, "Channel download failed");
        }
        results.push(result);
    }

    results
}

/// Download again the newest `number` local claims, or a random selection
/// with `shuffle`, to complete partial downloads
pub async fn redownload_latest(
    session: &Session,
    number: usize,
    shuffle: bool,
    opts: &DownloadOptions,
) -> Outcome<BatchResult> {
    let mut items = sort_items(&session.daemon, None, true).await?;

    if shuffle {
        items.shuffle(&mut rand::rng());
    }
    items.truncate(number);

    let n_items = items.len();
    let mut results = Vec::with_capacity(n_items);

    for (num, item) in items.iter().enumerate() {
        info!(index = num + 1, total = n_items, claim_id = %item.claim_id, "Re-download claim");

        let result = download_single(session, &ClaimRef::ClaimId(item.claim_id.clone()), false, opts).await;
        log_result(num + 1, n_items, &item.claim_id, &result);
        results.push(result);
    }

    Ok(results)
}

/// Download the claims numbered `start..=end` (1-based, `end = 0` for the
/// last) from local files or from a claim file
pub async fn download_claims(
    session: &Session,
    source: &ClaimSource,
    start: usize,
    end: usize,
    invalid: bool,
    opts: &DownloadOptions,
) -> Outcome<BatchResult> {
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

        info!(index = it, total = n_items, claim_id = %cid, "Claim");
        let result = download_single(session, &ClaimRef::ClaimId(cid.clone()), invalid, opts).await;
        log_result(it, n_items, cid, &result);
        results.push(result);
    }

    Ok(results)
}

/// One line per claim of a multi-channel download
pub fn multi_list_lines(results: &[Outcome<BatchResult>], sep: &str) -> Vec<String> {
    let flat: Vec<Option<&Outcome<DownloadInfo>>> = results
        .iter()
        .flat_map(|channel| match channel {
            Ok(items) if !items.is_empty() => items.iter().map(Some).collect(),
            _ => vec![None],
        })
        .collect();

    let n = flat.len();

    flat.iter()
        .enumerate()
        .map(|(num, item)| {
            let head = format!("{:2}/{:2}{sep} ", num + 1, n);
            match item {
                None => format!("{head}empty item. Failure establishing server connection?"),
                Some(Ok(info)) => format!(
                    "{head}{}{sep} {:3}/{:3}{sep} \"{}\"{sep} \"{}\"",
                    info.claim_id,
                    info.blobs_completed,
                    info.blobs_in_stream,
                    info.channel_name.as_deref().unwrap_or("None"),
                    info.claim_name
                ),
                Some(Err(e)) => format!("{head}\"{e}\""),
            }
        })
        .collect()
}
