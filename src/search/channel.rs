use crate::api::client::{DaemonClient, ItemPage};
use crate::core::error::{Outcome, ToolError};
use crate::models::claim::{strip_scheme, Claim};
use crate::search::item::{search_item, search_item_offline};
use crate::utils::channels::normalize_channel;
use crate::validation::params::ClaimRef;
use clap::ValueEnum;
use serde_json::json;
use tracing::{debug, info};

/// Largest page `claim_search` returns
pub const SEARCH_PAGE_LIMIT: usize = 50;

/// Placeholder for claims without a signing channel
pub const UNKNOWN_CHANNEL: &str = "@_Unknown_";

/// Resolve a channel by name, `@name`, `name#3` or full URI
pub async fn resolve_channel(daemon: &DaemonClient, channel: &str) -> Outcome<Claim> {
    let channel = normalize_channel(channel.trim_start_matches('[').trim_end_matches(']'));

    match search_item(daemon, &ClaimRef::Uri(channel.clone())).await {
        Err(ToolError::NotFound(reason)) => Err(ToolError::NotFound(format!(
            "channel {channel} ({reason})"
        ))),
        other => other,
    }
}

/// The newest `number` claims of a channel, newest first.
///
/// `claim_search` caps pages at 50 items, so larger requests walk pages.
pub async fn ch_search_latest(daemon: &DaemonClient, channel: &str, number: usize) -> Outcome<Vec<Claim>> {
    if number == 0 {
        return Err(ToolError::InvalidInput("number of claims must be positive".to_string()));
    }

    let bare = channel.trim_start_matches('[').trim_end_matches(']');
    let channel = normalize_channel(bare);

    // The daemon only knows a channel for claim_search after resolving it
    resolve_channel(daemon, &channel).await?;

    let page_size = number.min(SEARCH_PAGE_LIMIT);
    let mut claims: Vec<Claim> = Vec::with_capacity(number);
    let mut page = 1;

    loop {
        debug!(channel = %channel, page, page_size, "Searching channel claims");

        let result: ItemPage<Claim> = daemon
            .items(
                "claim_search",
                json!({
                    "channel": channel,
                    "page": page,
                    "page_size": page_size,
                    "order_by": "release_time",
                }),
            )
            .await?;

        let received = result.items.len();
        claims.extend(result.items);

        let last_page = result.total_pages.map_or(true, |total| page as i64 >= total);
        if claims.len() >= number || received < page_size || last_page {
            break;
        }
        page += 1;
    }

    claims.truncate(number);

    if claims.is_empty() {
        return Err(ToolError::NotFound(format!("no claims in channel {channel}")));
    }

    info!(channel = %channel, claims = claims.len(), "Found channel claims");
    Ok(claims)
}

/// How `find_channel` spells the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ChannelForm {
    /// `@MyChannel#3`
    #[default]
    Full,
    /// `@MyChannel`
    Short,
    /// `lbry://@MyChannel#3`
    Canonical,
}

/// Channel that published a claim
pub async fn find_channel(
    daemon: &DaemonClient,
    claim: &ClaimRef,
    form: ChannelForm,
    offline: bool,
) -> Outcome<String> {
    if offline {
        let item = search_item_offline(daemon, claim).await?;
        return Ok(item.channel_name.unwrap_or_else(|| UNKNOWN_CHANNEL.to_string()));
    }

    let item = search_item(daemon, claim).await?;

    let Some(canonical) = item
        .signing_channel
        .as_ref()
        .and_then(|ch| ch.canonical_url.clone())
    else {
        return Ok(UNKNOWN_CHANNEL.to_string());
    };

    Ok(format_channel(&canonical, form))
}

pub fn format_channel(canonical: &str, form: ChannelForm) -> String {
    match form {
        ChannelForm::Canonical => canonical.to_string(),
        ChannelForm::Full => strip_scheme(canonical),
        ChannelForm::Short => strip_scheme(canonical)
            .split('#')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
